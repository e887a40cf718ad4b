//! API data transfer objects.
//!
//! These types define the API contract shared between the server and
//! clients. The collaborator modules use them directly as their records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

pub type UserId = u64;
pub type ContactId = u64;
pub type IncidentId = u64;

/// Profile of a registered user.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Clone, Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Emergency contact.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
    pub relation: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relation: String,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IncidentKind {
    Harassment,
    Suspicious,
    Theft,
    #[default]
    Other,
}

/// Community incident report, as listed.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Incident {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub date: OffsetDateTime,
    pub kind: IncidentKind,
    pub reporter_id: UserId,
    /// Display name of the reporter, or "Anonymous" when unknown.
    pub reporter_name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct NewIncident {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    /// When the incident happened. Defaults to the time of reporting.
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub date: Option<OffsetDateTime>,
    #[serde(default)]
    pub kind: IncidentKind,
}

/// Last known position of the user's device.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertPhase {
    Idle,
    Counting,
    Dispatched,
}

/// Read-only snapshot of the SOS alert, for rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct SosState {
    pub phase: AlertPhase,
    pub remaining_ticks: u32,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertEventKind {
    Started,
    Cancelled,
    Dispatched,
    DispatchFailed,
    /// Timers could not be scheduled; the alert was not armed.
    ArmFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Informational,
    Urgent,
}

/// Notification emitted by the alert controller.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct AlertEvent {
    pub kind: AlertEventKind,
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct Helpline {
    pub name: String,
    pub phone: String,
    pub description: String,
    pub hours: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct SafetyGuide {
    pub id: u32,
    pub title: String,
    pub summary: String,
    pub content: String,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SafeSpotKind {
    Police,
    Hospital,
    Shelter,
    SafeBusiness,
}

#[derive(Clone, Debug, Deserialize, Serialize, ToSchema)]
pub struct SafeSpot {
    pub id: u32,
    pub name: String,
    pub kind: SafeSpotKind,
    pub rating: f32,
    pub distance: String,
    pub address: String,
}
