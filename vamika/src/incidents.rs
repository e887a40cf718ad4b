//! Community incident reports.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::api_client::types::{Incident, IncidentId, NewIncident, UserProfile};
use crate::error::{Error, Result};
use crate::session::SessionProvider;
use crate::tracing::prelude::*;

/// Shown in place of a reporter whose profile cannot be found.
pub const ANONYMOUS_REPORTER: &str = "Anonymous";

#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// All reports, newest first, with reporter names resolved.
    async fn list(&self) -> Result<Vec<Incident>>;

    /// File a report on behalf of `reporter`.
    async fn report(&self, reporter: &UserProfile, incident: NewIncident) -> Result<Incident>;
}

/// Incident store held in memory. Reporter names are looked up at
/// listing time so profile renames show up in old reports.
pub struct InMemoryIncidentStore {
    reports: Mutex<Reports>,
    directory: Arc<dyn SessionProvider>,
}

#[derive(Default)]
struct Reports {
    next_id: IncidentId,
    incidents: Vec<Incident>,
}

impl InMemoryIncidentStore {
    pub fn new(directory: Arc<dyn SessionProvider>) -> Self {
        Self {
            reports: Mutex::new(Reports::default()),
            directory,
        }
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn list(&self) -> Result<Vec<Incident>> {
        let mut incidents = self.reports.lock().incidents.clone();
        incidents.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        for incident in &mut incidents {
            incident.reporter_name = self
                .directory
                .display_name(incident.reporter_id)
                .await
                .unwrap_or_else(|| ANONYMOUS_REPORTER.to_string());
        }

        Ok(incidents)
    }

    async fn report(&self, reporter: &UserProfile, incident: NewIncident) -> Result<Incident> {
        let title = incident.title.trim();
        let location = incident.location.trim();
        if title.is_empty() || location.is_empty() {
            return Err(Error::Invalid(
                "please provide at least a title and location".into(),
            ));
        }

        let mut reports = self.reports.lock();
        reports.next_id += 1;
        let stored = Incident {
            id: reports.next_id,
            title: title.to_string(),
            description: incident.description.trim().to_string(),
            location: location.to_string(),
            date: incident.date.unwrap_or_else(OffsetDateTime::now_utc),
            kind: incident.kind,
            reporter_id: reporter.id,
            reporter_name: reporter.name.clone(),
        };
        reports.incidents.push(stored.clone());

        info!(
            incident_id = stored.id,
            kind = %stored.kind,
            reporter_id = reporter.id,
            "Incident reported"
        );
        Ok(stored)
    }
}
