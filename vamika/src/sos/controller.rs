use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use time::OffsetDateTime;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, Interval, Sleep};
use tokio_util::sync::CancellationToken;

use super::commands::AlertCommand;
use super::config::{AlertConfig, TICK_PERIOD};
use super::state::AlertState;
use super::timers::TimerSource;
use crate::api_client::types::{AlertEvent, Location, SosState, UserProfile};
use crate::notify::{ContactNotifier, EmergencyContext, NotifyError};
use crate::tracing::prelude::*;

/// Events buffered per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 32;

type Notification = Pin<Box<dyn Future<Output = Result<usize, NotifyError>> + Send>>;

/// Auto-expiry deadline, tagged with the arming it belongs to.
struct Expiry {
    armed_at: Instant,
    sleep: Pin<Box<Sleep>>,
}

/// Owns the SOS alert of one signed-in user.
///
/// All transitions run on the controller's own task, one at a time:
/// commands from handles, countdown ticks and the expiry deadline are
/// multiplexed in [`run`](Self::run). The timers are fields of the
/// controller and are dropped on every exit from `Counting`, so a
/// cancelled countdown cannot tick or expire afterwards.
///
/// Contact notification is polled from the same loop rather than
/// awaited inline, so commands are answered while it is in flight.
pub struct AlertController {
    config: AlertConfig,
    profile_rx: watch::Receiver<UserProfile>,
    state: AlertState,
    tick_timer: Option<Interval>,
    expiry_timer: Option<Expiry>,
    notifications: FuturesUnordered<Notification>,
    timer_source: Arc<dyn TimerSource>,
    notifier: Arc<dyn ContactNotifier>,
    location_rx: watch::Receiver<Option<Location>>,
    state_tx: watch::Sender<SosState>,
    event_tx: broadcast::Sender<AlertEvent>,
}

impl AlertController {
    pub fn new(
        config: AlertConfig,
        profile_rx: watch::Receiver<UserProfile>,
        timer_source: Arc<dyn TimerSource>,
        notifier: Arc<dyn ContactNotifier>,
        location_rx: watch::Receiver<Option<Location>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(AlertState::Idle.snapshot(config.initial_count));
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            config,
            profile_rx,
            state: AlertState::Idle,
            tick_timer: None,
            expiry_timer: None,
            notifications: FuturesUnordered::new(),
            timer_source,
            notifier,
            location_rx,
            state_tx,
            event_tx,
        }
    }

    /// Receiver of state snapshots, updated on every transition.
    pub fn state_receiver(&self) -> watch::Receiver<SosState> {
        self.state_tx.subscribe()
    }

    /// Receiver of alert events. Closes when the controller is dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.event_tx.subscribe()
    }

    pub fn snapshot(&self) -> SosState {
        self.state.snapshot(self.config.initial_count)
    }

    /// Process commands and timers until `cancellation` fires or every
    /// handle is gone, then tear down.
    ///
    /// When several wake-ups are ready at once, shutdown wins over
    /// commands, commands over finished notifications and the tick, and
    /// the tick over expiry: a
    /// cancel racing the final tick cancels, and a final tick racing
    /// expiry dispatches.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<AlertCommand>,
        cancellation: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    break;
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(outcome) = self.notifications.next(), if !self.notifications.is_empty() => {
                    self.report_dispatch(outcome);
                }
                _ = next_tick(self.tick_timer.as_mut()) => {
                    self.tick();
                }
                armed_at = expiry_fired(self.expiry_timer.as_mut()) => {
                    self.expiry_timer = None;
                    self.auto_expire(armed_at);
                }
            }
        }

        self.teardown();
    }

    fn handle_command(&mut self, command: AlertCommand) {
        let reply = match command {
            AlertCommand::Activate { reply } => {
                self.activate();
                reply
            }
            AlertCommand::Cancel { reply } => {
                self.cancel();
                reply
            }
        };

        if reply.send(self.snapshot()).is_err() {
            trace!("SOS command caller went away before the reply");
        }
    }

    /// Toggle: arm when idle, cancel when counting, ignore once
    /// dispatched.
    pub fn activate(&mut self) {
        match self.state {
            AlertState::Idle => self.arm(),
            AlertState::Counting { .. } => self.cancel(),
            AlertState::Dispatched { .. } => {
                debug!("SOS already dispatched; activation ignored");
            }
        }
    }

    /// Stop the countdown and reset to idle. Valid in every phase;
    /// cancelling an idle alert does nothing and emits nothing.
    pub fn cancel(&mut self) {
        self.stop_timers();

        match self.state {
            AlertState::Idle => {
                trace!("SOS cancel with nothing armed");
            }
            AlertState::Counting {
                remaining_ticks, ..
            } => {
                self.set_state(AlertState::Idle);
                info!(remaining_ticks, "SOS cancelled");
                self.emit(AlertEvent::cancelled());
            }
            AlertState::Dispatched { .. } => {
                // The dispatch already went out and is not retracted; an
                // in-flight notification still runs and reports.
                self.set_state(AlertState::Idle);
                info!("SOS reset after dispatch");
            }
        }
    }

    fn arm(&mut self) {
        let armed_at = Instant::now();

        match self
            .timer_source
            .arm(armed_at, TICK_PERIOD, self.config.auto_expiry)
        {
            Ok(timers) => {
                self.tick_timer = Some(timers.tick);
                self.expiry_timer = Some(Expiry {
                    armed_at,
                    sleep: timers.expiry,
                });
                self.set_state(AlertState::Counting {
                    remaining_ticks: self.config.initial_count,
                    armed_at,
                });
                warn!(
                    user_id = self.profile_rx.borrow().id,
                    countdown = self.config.initial_count,
                    "SOS activated"
                );
                self.emit(AlertEvent::started(self.config.initial_count));
            }
            Err(e) => {
                self.stop_timers();
                self.set_state(AlertState::Idle);
                error!(error = %e, "Could not schedule SOS timers");
                self.emit(AlertEvent::arm_failed(&e));
            }
        }
    }

    fn tick(&mut self) {
        let AlertState::Counting {
            remaining_ticks,
            armed_at,
        } = self.state
        else {
            trace!(phase = ?self.state.phase(), "SOS tick outside countdown ignored");
            return;
        };

        let remaining_ticks = remaining_ticks.saturating_sub(1);
        if remaining_ticks > 0 {
            self.set_state(AlertState::Counting {
                remaining_ticks,
                armed_at,
            });
            debug!(remaining_ticks, "SOS countdown tick");
            return;
        }

        // Dispatch pre-empts expiry.
        self.stop_timers();
        self.set_state(AlertState::Dispatched { armed_at });
        self.dispatch();
    }

    /// Cancel silently if the alert armed at `armed_at` is still counting.
    /// Reads live state, so a late expiry never touches a dispatched alert
    /// or a newer arming.
    fn auto_expire(&mut self, armed_at: Instant) {
        match self.state {
            AlertState::Counting {
                armed_at: current, ..
            } if current == armed_at => {
                self.stop_timers();
                self.set_state(AlertState::Idle);
                info!("SOS expired before dispatch");
                self.emit(AlertEvent::expired());
            }
            _ => {
                debug!(phase = ?self.state.phase(), "Stale SOS expiry ignored");
            }
        }
    }

    /// Start notifying contacts once. The outcome is reported by
    /// [`report_dispatch`](Self::report_dispatch) when the notification
    /// resolves; failures are never retried.
    fn dispatch(&mut self) {
        let context = EmergencyContext {
            user: self.profile_rx.borrow().clone(),
            location: *self.location_rx.borrow(),
            raised_at: OffsetDateTime::now_utc(),
        };
        warn!(
            user_id = context.user.id,
            has_location = context.location.is_some(),
            "SOS dispatched; notifying emergency contacts"
        );

        let notifier = Arc::clone(&self.notifier);
        let timeout = self.config.notify_timeout;
        self.notifications.push(Box::pin(async move {
            tokio::time::timeout(timeout, notifier.notify_contacts(&context))
                .await
                .unwrap_or(Err(NotifyError::Timeout(timeout)))
        }));
    }

    /// The phase is left alone: a notification finishing after a reset
    /// still reports against the dispatch that started it.
    fn report_dispatch(&mut self, outcome: Result<usize, NotifyError>) {
        match outcome {
            Ok(reached) => {
                info!(reached, "Emergency contacts notified");
                self.emit(AlertEvent::dispatched(reached));
            }
            Err(e) => {
                error!(error = %e, "Emergency contact notification failed");
                self.emit(AlertEvent::dispatch_failed(&e));
            }
        }
    }

    fn teardown(&mut self) {
        if !self.notifications.is_empty() {
            warn!(
                pending = self.notifications.len(),
                "SOS controller stopping with contact notification in flight"
            );
        }
        self.notifications.clear();
        self.stop_timers();
        self.set_state(AlertState::Idle);
        debug!(user_id = self.profile_rx.borrow().id, "SOS controller stopped");
    }

    fn stop_timers(&mut self) {
        self.tick_timer = None;
        self.expiry_timer = None;
    }

    fn set_state(&mut self, state: AlertState) {
        self.state = state;
        self.state_tx
            .send_replace(state.snapshot(self.config.initial_count));
    }

    fn emit(&self, event: AlertEvent) {
        if self.event_tx.send(event).is_err() {
            trace!("No SOS event subscribers");
        }
    }
}

async fn next_tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn expiry_fired(expiry: Option<&mut Expiry>) -> Instant {
    match expiry {
        Some(expiry) => {
            expiry.sleep.as_mut().await;
            expiry.armed_at
        }
        None => std::future::pending().await,
    }
}
