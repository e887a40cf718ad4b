//! API v0 endpoints.
//!
//! Version 0 signals an unstable API -- breaking changes are expected
//! until the daemon reaches 1.0.

use axum::{
    Json,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::error::{ApiError, ErrorBody};
use super::server::SharedState;
use crate::api_client::types::{
    AlertEvent, Contact, ContactId, Helpline, Incident, Location, NewContact, NewIncident,
    ProfileUpdate, SafeSpot, SafetyGuide, SignInRequest, SignUpRequest, SosState, UserProfile,
};
use crate::error::Error;
use crate::resources;

type ApiResult<T> = Result<T, ApiError>;

/// Build the v0 API routes with OpenAPI metadata.
///
/// Everything except health and sign-in/sign-up answers 401 until a user
/// is signed in.
pub fn routes(state: SharedState) -> OpenApiRouter<SharedState> {
    let public = OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(sign_up))
        .routes(routes!(sign_in));

    let guarded = OpenApiRouter::new()
        .routes(routes!(sign_out))
        .routes(routes!(get_profile, patch_profile))
        .routes(routes!(get_sos))
        .routes(routes!(activate_sos))
        .routes(routes!(cancel_sos))
        .routes(routes!(sos_events))
        .routes(routes!(put_location))
        .routes(routes!(list_contacts, add_contact))
        .routes(routes!(remove_contact))
        .routes(routes!(list_incidents, report_incident))
        .routes(routes!(get_helplines))
        .routes(routes!(get_guides))
        .routes(routes!(get_safe_spots))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    public.merge(guarded)
}

async fn require_session(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    if state.shell.is_authenticated().await {
        next.run(request).await
    } else {
        ApiError::from(Error::Unauthenticated).into_response()
    }
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = OK, description = "Server is running", body = String),
    ),
)]
async fn health() -> &'static str {
    "OK"
}

/// Create an account and sign it in.
#[utoipa::path(
    post,
    path = "/session/sign-up",
    tag = "session",
    request_body = SignUpRequest,
    responses(
        (status = CREATED, description = "Account created and signed in", body = UserProfile),
        (status = BAD_REQUEST, description = "Invalid email, password or name", body = ErrorBody),
        (status = CONFLICT, description = "Email already registered", body = ErrorBody),
    ),
)]
async fn sign_up(
    State(state): State<SharedState>,
    Json(req): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let user = state.shell.sign_up(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/session/sign-in",
    tag = "session",
    request_body = SignInRequest,
    responses(
        (status = OK, description = "Signed in", body = UserProfile),
        (status = BAD_REQUEST, description = "Invalid login credentials", body = ErrorBody),
    ),
)]
async fn sign_in(
    State(state): State<SharedState>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.shell.sign_in(req).await?))
}

/// End the session, cancelling any SOS countdown.
#[utoipa::path(
    post,
    path = "/session/sign-out",
    tag = "session",
    responses(
        (status = NO_CONTENT, description = "Signed out"),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn sign_out(State(state): State<SharedState>) -> ApiResult<StatusCode> {
    state.shell.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "profile",
    responses(
        (status = OK, description = "Signed-in user", body = UserProfile),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn get_profile(State(state): State<SharedState>) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.shell.require_user().await?))
}

/// Apply partial updates to the profile.
#[utoipa::path(
    patch,
    path = "/profile",
    tag = "profile",
    request_body = ProfileUpdate,
    responses(
        (status = OK, description = "Updated profile", body = UserProfile),
        (status = BAD_REQUEST, description = "Invalid field", body = ErrorBody),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn patch_profile(
    State(state): State<SharedState>,
    Json(req): Json<ProfileUpdate>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.shell.update_profile(req).await?))
}

/// Return the current SOS alert state.
#[utoipa::path(
    get,
    path = "/sos",
    tag = "sos",
    responses(
        (status = OK, description = "Current alert state", body = SosState),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn get_sos(State(state): State<SharedState>) -> ApiResult<Json<SosState>> {
    Ok(Json(state.shell.alert().await?.snapshot()))
}

/// Toggle the SOS alert: start the countdown when idle, cancel it when
/// counting. Ignored once dispatched.
#[utoipa::path(
    post,
    path = "/sos/activate",
    tag = "sos",
    responses(
        (status = OK, description = "Alert state after the toggle", body = SosState),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Alert controller stopped", body = ErrorBody),
    ),
)]
async fn activate_sos(State(state): State<SharedState>) -> ApiResult<Json<SosState>> {
    let alert = state.shell.alert().await?;
    Ok(Json(alert.activate().await?))
}

/// Cancel the SOS alert and reset it to idle.
#[utoipa::path(
    post,
    path = "/sos/cancel",
    tag = "sos",
    responses(
        (status = OK, description = "Alert state after cancelling", body = SosState),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Alert controller stopped", body = ErrorBody),
    ),
)]
async fn cancel_sos(State(state): State<SharedState>) -> ApiResult<Json<SosState>> {
    let alert = state.shell.alert().await?;
    Ok(Json(alert.cancel().await?))
}

/// Stream alert events as server-sent events, named after the event
/// kind. The stream ends at sign-out.
#[utoipa::path(
    get,
    path = "/sos/events",
    tag = "sos",
    responses(
        (status = OK, description = "Event stream", content_type = "text/event-stream", body = AlertEvent),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn sos_events(
    State(state): State<SharedState>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let alert = state.shell.alert().await?;
    // Lagged subscribers skip what they missed.
    let stream = BroadcastStream::new(alert.subscribe())
        .filter_map(|event| event.ok())
        .map(|event: AlertEvent| Event::default().event(event.kind.to_string()).json_data(event));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Record the device's last known location, sent along with an SOS.
#[utoipa::path(
    put,
    path = "/location",
    tag = "sos",
    request_body = Location,
    responses(
        (status = NO_CONTENT, description = "Location recorded"),
        (status = BAD_REQUEST, description = "Coordinates out of range", body = ErrorBody),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn put_location(
    State(state): State<SharedState>,
    Json(location): Json<Location>,
) -> ApiResult<StatusCode> {
    state.shell.update_location(location).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/contacts",
    tag = "contacts",
    responses(
        (status = OK, description = "Emergency contacts", body = Vec<Contact>),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn list_contacts(State(state): State<SharedState>) -> ApiResult<Json<Vec<Contact>>> {
    Ok(Json(state.shell.contacts().await?))
}

#[utoipa::path(
    post,
    path = "/contacts",
    tag = "contacts",
    request_body = NewContact,
    responses(
        (status = CREATED, description = "Contact added", body = Contact),
        (status = BAD_REQUEST, description = "Missing or invalid name or phone", body = ErrorBody),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn add_contact(
    State(state): State<SharedState>,
    Json(req): Json<NewContact>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let contact = state.shell.add_contact(req).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = "contacts",
    params(
        ("id" = u64, Path, description = "Contact id"),
    ),
    responses(
        (status = NO_CONTENT, description = "Contact removed"),
        (status = NOT_FOUND, description = "Contact not found", body = ErrorBody),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn remove_contact(
    State(state): State<SharedState>,
    Path(id): Path<ContactId>,
) -> ApiResult<StatusCode> {
    state.shell.remove_contact(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Return reported incidents, newest first.
#[utoipa::path(
    get,
    path = "/incidents",
    tag = "incidents",
    responses(
        (status = OK, description = "Incidents, newest first", body = Vec<Incident>),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn list_incidents(State(state): State<SharedState>) -> ApiResult<Json<Vec<Incident>>> {
    Ok(Json(state.shell.incidents().await?))
}

#[utoipa::path(
    post,
    path = "/incidents",
    tag = "incidents",
    request_body = NewIncident,
    responses(
        (status = CREATED, description = "Incident reported", body = Incident),
        (status = BAD_REQUEST, description = "Missing title or location", body = ErrorBody),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn report_incident(
    State(state): State<SharedState>,
    Json(req): Json<NewIncident>,
) -> ApiResult<(StatusCode, Json<Incident>)> {
    let incident = state.shell.report_incident(req).await?;
    Ok((StatusCode::CREATED, Json(incident)))
}

#[utoipa::path(
    get,
    path = "/resources/helplines",
    tag = "resources",
    responses(
        (status = OK, description = "Emergency helplines", body = Vec<Helpline>),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn get_helplines() -> Json<Vec<Helpline>> {
    Json(resources::helplines())
}

#[utoipa::path(
    get,
    path = "/resources/guides",
    tag = "resources",
    responses(
        (status = OK, description = "Safety guides", body = Vec<SafetyGuide>),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn get_guides() -> Json<Vec<SafetyGuide>> {
    Json(resources::safety_guides())
}

#[derive(Debug, Deserialize, IntoParams)]
struct SafeSpotQuery {
    /// Case-insensitive match on name, address or kind.
    q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/resources/safe-spots",
    tag = "resources",
    params(SafeSpotQuery),
    responses(
        (status = OK, description = "Safe spots matching the query", body = Vec<SafeSpot>),
        (status = UNAUTHORIZED, description = "Not signed in", body = ErrorBody),
    ),
)]
async fn get_safe_spots(Query(query): Query<SafeSpotQuery>) -> Json<Vec<SafeSpot>> {
    Json(resources::search_safe_spots(query.q.as_deref().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Method, header},
    };
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use super::*;
    use crate::api::build_router;
    use crate::api_client::types::AlertPhase;
    use crate::shell::{Collaborators, Shell};
    use crate::sos::AlertConfig;

    fn app() -> Router {
        let shell = Shell::new(
            Collaborators::default(),
            AlertConfig::default(),
            CancellationToken::new(),
        );
        build_router(SharedState {
            shell: Arc::new(shell),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut request = axum::http::Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        app.clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn signed_up_app() -> Router {
        let app = app();
        let response = send(
            &app,
            Method::POST,
            "/api/v0/session/sign-up",
            Some(json!({
                "email": "nisha@example.com",
                "password": "secret1",
                "name": "Nisha",
                "phone": "555-0142",
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        app
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = send(&app(), Method::GET, "/api/v0/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn guarded_routes_need_a_session() {
        let app = app();

        for (method, uri) in [
            (Method::GET, "/api/v0/profile"),
            (Method::GET, "/api/v0/sos"),
            (Method::POST, "/api/v0/sos/activate"),
            (Method::GET, "/api/v0/contacts"),
            (Method::GET, "/api/v0/incidents"),
            (Method::GET, "/api/v0/resources/helplines"),
            (Method::GET, "/api/v0/resources/safe-spots"),
            (Method::POST, "/api/v0/session/sign-out"),
        ] {
            let response = send(&app, method.clone(), uri, None).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
            let body: Value = json(response).await;
            assert_eq!(body["error"], "not signed in");
        }
    }

    #[tokio::test]
    async fn sign_in_rejects_bad_credentials() {
        let app = signed_up_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/v0/session/sign-in",
            Some(json!({ "email": "nisha@example.com", "password": "wrong-one" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_sign_up_conflicts() {
        let app = signed_up_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/v0/session/sign-up",
            Some(json!({
                "email": "NISHA@example.com",
                "password": "secret1",
                "name": "Other",
                "phone": "",
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn activate_toggles_the_alert() {
        let app = signed_up_app().await;

        let state: SosState = json(send(&app, Method::POST, "/api/v0/sos/activate", None).await).await;
        assert_eq!(state.phase, AlertPhase::Counting);
        assert_eq!(state.remaining_ticks, 3);

        let state: SosState = json(send(&app, Method::POST, "/api/v0/sos/activate", None).await).await;
        assert_eq!(state.phase, AlertPhase::Idle);

        let state: SosState = json(send(&app, Method::GET, "/api/v0/sos", None).await).await;
        assert_eq!(state.phase, AlertPhase::Idle);
    }

    #[tokio::test]
    async fn cancel_resets_a_counting_alert() {
        let app = signed_up_app().await;
        send(&app, Method::POST, "/api/v0/sos/activate", None).await;

        let response = send(&app, Method::POST, "/api/v0/sos/cancel", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let state: SosState = json(response).await;
        assert_eq!(state.phase, AlertPhase::Idle);
        assert_eq!(state.remaining_ticks, 3);
    }

    #[tokio::test]
    async fn contacts_round_trip() {
        let app = signed_up_app().await;

        let seeded: Vec<Contact> = json(send(&app, Method::GET, "/api/v0/contacts", None).await).await;
        assert_eq!(seeded.len(), 2);

        let response = send(
            &app,
            Method::POST,
            "/api/v0/contacts",
            Some(json!({ "name": "Ravi", "phone": "+91 98765 43210" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let added: Contact = json(response).await;

        let uri = format!("/api/v0/contacts/{}", added.id);
        let response = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn contact_without_phone_is_rejected() {
        let app = signed_up_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/v0/contacts",
            Some(json!({ "name": "Ravi", "phone": "  " })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn incidents_are_reported_and_listed() {
        let app = signed_up_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/v0/incidents",
            Some(json!({
                "title": "Catcalling near bus stop",
                "location": "MG Road",
                "kind": "harassment",
                "date": "2026-03-01T18:30:00Z",
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let incidents: Vec<Incident> =
            json(send(&app, Method::GET, "/api/v0/incidents", None).await).await;
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].reporter_name, "Nisha");
    }

    #[tokio::test]
    async fn safe_spots_filter_by_query() {
        let app = signed_up_app().await;

        let all: Vec<SafeSpot> =
            json(send(&app, Method::GET, "/api/v0/resources/safe-spots", None).await).await;
        let police: Vec<SafeSpot> = json(
            send(&app, Method::GET, "/api/v0/resources/safe-spots?q=POLICE", None).await,
        )
        .await;

        assert_eq!(all.len(), resources::safe_spots().len());
        assert!(!police.is_empty());
        assert!(police.len() < all.len());
    }

    #[tokio::test]
    async fn location_out_of_range_is_rejected() {
        let app = signed_up_app().await;

        let response = send(
            &app,
            Method::PUT,
            "/api/v0/location",
            Some(json!({ "latitude": 12.9, "longitude": 200.0 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            Method::PUT,
            "/api/v0/location",
            Some(json!({ "latitude": 12.9, "longitude": 77.6 })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn sign_out_closes_the_guard() {
        let app = signed_up_app().await;

        let response = send(&app, Method::POST, "/api/v0/session/sign-out", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, Method::GET, "/api/v0/sos", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_updates_apply() {
        let app = signed_up_app().await;

        let response = send(
            &app,
            Method::PATCH,
            "/api/v0/profile",
            Some(json!({ "phone": "555-0199" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let profile: UserProfile = json(send(&app, Method::GET, "/api/v0/profile", None).await).await;
        assert_eq!(profile.name, "Nisha");
        assert_eq!(profile.phone, "555-0199");
    }

    #[tokio::test]
    async fn openapi_document_lists_v0_routes() {
        let response = send(&app(), Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let doc: Value = json(response).await;
        assert!(doc["paths"]["/api/v0/sos/activate"].is_object());
        assert!(doc["paths"]["/api/v0/contacts/{id}"].is_object());
    }
}
