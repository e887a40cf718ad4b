//! The SOS alert: a short cancellable countdown that notifies the user's
//! emergency contacts when it runs out.
//!
//! ```text
//!   Idle --activate--> Counting --tick x N--> Dispatched
//!    ^                  |   |                     |
//!    +----cancel--------+   +--expiry--> Idle     |
//!    +----------------------cancel----------------+
//! ```
//!
//! An [`AlertController`] owns the state and its timers and runs on its own
//! task; [`AlertHandle`]s send it commands and observe state and events.
//! [`AlertSession`] ties a controller's lifetime to a signed-in user.

mod commands;
pub mod config;
mod controller;
mod events;
mod handle;
mod session;
mod state;
mod timers;

pub use config::AlertConfig;
pub use controller::AlertController;
pub use handle::{AlertError, AlertHandle};
pub use session::AlertSession;
pub use state::AlertState;
pub use timers::{ArmedTimers, TimerError, TimerSource, TokioTimers};
