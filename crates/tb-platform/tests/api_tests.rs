//! API Integration Tests
//!
//! Drives the service routers through `tower::ServiceExt::oneshot`. The
//! booking tests run the event and attendee services on local listeners so
//! the ticket service talks to them over real HTTP.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tb_config::AppConfig;
use tb_platform::api::{
    attendee_service_app, event_service_app, ticket_service_app, AppState, AttendeesState,
    EventsState, TicketsState,
};
use tb_platform::repository::{
    InMemoryAttendeeRepository, InMemoryBookingRepository, InMemoryEventRepository,
};
use tb_platform::service::{AuthConfig, AuthService};

const SECRET: &str = "integration-secret";

fn app_state() -> AppState {
    AppState::new(Arc::new(AuthService::new(AuthConfig::new(SECRET))))
}

fn token(role: &str) -> String {
    AuthService::new(AuthConfig::new(SECRET)).issue_token("tester", role).unwrap()
}

fn event_app() -> Router {
    event_service_app(
        app_state(),
        EventsState { event_repo: Arc::new(InMemoryEventRepository::new()) },
    )
}

fn attendee_app() -> Router {
    attendee_service_app(
        app_state(),
        AttendeesState { attendee_repo: Arc::new(InMemoryAttendeeRepository::new()) },
    )
}

async fn call(app: &Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn bearer(role: &str) -> String {
    format!("Bearer {}", token(role))
}

// ============================================================================
// Authentication
// ============================================================================

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_issues_token() {
        let app = event_app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "role": "Admin"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let issued = body["token"].as_str().unwrap();
        let claims = AuthService::new(AuthConfig::new(SECRET)).validate_token(issued).unwrap();
        assert_eq!(claims.role, "Admin");
    }

    #[tokio::test]
    async fn test_login_requires_username_and_role() {
        let (status, body) = call(
            &event_app(),
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "alice"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "username and role are required");
    }

    #[tokio::test]
    async fn test_token_failures() {
        let app = event_app();

        let (status, body) = call(&app, Method::GET, "/api/events", None, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "access denied, no token provided");

        let (status, body) = call(&app, Method::GET, "/api/events", Some("Token abc"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "invalid token format");

        let (status, body) = call(&app, Method::GET, "/api/events", Some("Bearer not.a.jwt"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_role_gate() {
        let (status, body) = call(
            &event_app(),
            Method::POST,
            "/api/events",
            Some(&bearer("User")),
            Some(json!({"name": "E", "location": "L", "date": "2025-05-01", "ticketAvailability": 5})),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "insufficient permissions!");
    }

    #[tokio::test]
    async fn test_health_and_openapi_are_public() {
        let app = attendee_app();
        let (status, body) = call(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "attendee-service");

        let (status, body) = call(&app, Method::GET, "/api/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/attendees/{id}/preferences"].is_object());
    }
}

// ============================================================================
// Events
// ============================================================================

mod event_tests {
    use super::*;

    async fn create(app: &Router, name: &str, availability: i64) -> Value {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/events",
            Some(&bearer("Admin")),
            Some(json!({
                "name": name,
                "location": "Montreal",
                "date": "2025-09-01T18:00:00Z",
                "ticketAvailability": availability
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "event successfully created");
        body["event"].clone()
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let app = event_app();
        let event = create(&app, "RustConf", 5).await;
        create(&app, "Sold Out", 0).await;

        let id = event["id"].as_str().unwrap();
        let (status, body) = call(&app, Method::GET, &format!("/api/events/{}", id), Some(&bearer("User")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticketAvailability"], 5);

        let (status, body) = call(&app, Method::GET, "/api/events", Some(&bearer("User")), None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body.as_array().unwrap().iter().map(|e| e["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["RustConf"]);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let app = event_app();
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/events",
            Some(&bearer("Admin")),
            Some(json!({"name": "E", "location": "L", "date": "2025-05-01", "ticketAvailability": -1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_REQUEST");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/events",
            Some(&bearer("Admin")),
            Some(json!({"name": "E", "location": "L", "date": "someday", "ticketAvailability": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let (status, body) = call(&event_app(), Method::GET, "/api/events/nope", Some(&bearer("User")), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_tickets_rechecks_availability() {
        let app = event_app();
        let event = create(&app, "RustConf", 5).await;
        let id = event["id"].as_str().unwrap();

        let (status, body) = call(
            &app,
            Method::PATCH,
            "/api/events/updateTickets",
            Some(&bearer("Admin")),
            Some(json!({"eventId": id, "tickets": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event"]["ticketAvailability"], 2);

        let (status, body) = call(
            &app,
            Method::PATCH,
            "/api/events/updateTickets",
            Some(&bearer("Admin")),
            Some(json!({"eventId": id, "tickets": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INSUFFICIENT_AVAILABILITY");
        assert!(body["message"].as_str().unwrap().starts_with("not enough tickets available"));

        let (status, body) = call(
            &app,
            Method::PATCH,
            "/api/events/updateTickets",
            Some(&bearer("Admin")),
            Some(json!({"eventId": id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "event ID and tickets are required");

        let (status, _) = call(
            &app,
            Method::PATCH,
            "/api/events/updateTickets",
            Some(&bearer("Admin")),
            Some(json!({"eventId": "nope", "tickets": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Attendees
// ============================================================================

mod attendee_tests {
    use super::*;

    fn attendee_body(email: &str) -> Value {
        json!({
            "name": "Ada",
            "email": email,
            "phone": "555-0100",
            "event": "E1",
            "ticketsBooked": 2
        })
    }

    #[tokio::test]
    async fn test_register_and_duplicate_email() {
        let app = attendee_app();
        let (status, body) = call(&app, Method::POST, "/api/attendees", Some(&bearer("Admin")), Some(attendee_body("ada@example.com"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "attendee successfully registered");
        assert_eq!(body["attendee"]["isRegistered"], true);
        assert_eq!(body["attendee"]["preferences"]["meal"], "vegetarian");

        let (status, body) = call(&app, Method::POST, "/api/attendees", Some(&bearer("Admin")), Some(attendee_body("ada@example.com"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "DUPLICATE");
    }

    #[tokio::test]
    async fn test_register_requires_tickets() {
        let mut body = attendee_body("bob@example.com");
        body["ticketsBooked"] = json!(0);
        let (status, _) = call(&attendee_app(), Method::POST, "/api/attendees", Some(&bearer("Admin")), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_meal_preference_updates() {
        let app = attendee_app();
        let (_, created) = call(&app, Method::POST, "/api/attendees", Some(&bearer("Admin")), Some(attendee_body("ada@example.com"))).await;
        let uri = format!("/api/attendees/{}/preferences", created["attendee"]["id"].as_str().unwrap());

        let (status, body) = call(&app, Method::PATCH, &uri, Some(&bearer("Admin")), Some(json!({"meal": "vegan"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "attendee meal preference updated");
        assert_eq!(body["preferences"]["meal"], "vegan");

        let (status, body) = call(&app, Method::PATCH, &uri, Some(&bearer("Admin")), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preferences"]["meal"], "vegan");

        let (status, _) = call(&app, Method::PATCH, &uri, Some(&bearer("Admin")), Some(json!({"meal": "carnivore"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::PATCH, "/api/attendees/nope/preferences", Some(&bearer("Admin")), Some(json!({"meal": "vegan"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// ============================================================================
// Ticket booking across services
// ============================================================================

mod ticket_tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    struct Cluster {
        events: Router,
        attendees: Router,
        tickets: Router,
        config: AppConfig,
        bookings: Arc<InMemoryBookingRepository>,
    }

    async fn cluster_with(event_url: Option<String>) -> Cluster {
        let events = event_app();
        let attendees = attendee_app();

        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.remote.event_service_url = match event_url {
            Some(url) => url,
            None => serve(events.clone()).await,
        };
        config.remote.attendee_service_url = serve(attendees.clone()).await;
        config.remote.retry.max_retries = 1;
        config.remote.retry.initial_delay_ms = 1;

        let bookings = Arc::new(InMemoryBookingRepository::new());
        let tickets = ticket_app(&config, bookings.clone());

        Cluster { events, attendees, tickets, config, bookings }
    }

    fn ticket_app(config: &AppConfig, bookings: Arc<InMemoryBookingRepository>) -> Router {
        let auth = Arc::new(AuthService::new(AuthConfig::new(SECRET)));
        let state = TicketsState::from_config(config, auth.clone(), bookings).unwrap();
        ticket_service_app(AppState::new(auth), state)
    }

    async fn seed(cluster: &Cluster, availability: i64, registered: bool) -> (String, String) {
        let admin = bearer("Admin");
        let (_, event) = call(
            &cluster.events,
            Method::POST,
            "/api/events",
            Some(&admin),
            Some(json!({"name": "RustConf", "location": "Montreal", "date": "2025-09-01", "ticketAvailability": availability})),
        )
        .await;
        let (_, attendee) = call(
            &cluster.attendees,
            Method::POST,
            "/api/attendees",
            Some(&admin),
            Some(json!({"name": "Ada", "email": "ada@example.com", "phone": "555", "event": "E1", "ticketsBooked": 1})),
        )
        .await;

        let attendee_id = attendee["attendee"]["id"].as_str().unwrap().to_string();
        if !registered {
            call(
                &cluster.attendees,
                Method::PATCH,
                &format!("/api/attendees/{}/registration", attendee_id),
                Some(&admin),
                Some(json!({"isRegistered": false})),
            )
            .await;
        }
        (event["event"]["id"].as_str().unwrap().to_string(), attendee_id)
    }

    fn booking(attendee_id: &str, event_id: &str, tickets: i64) -> Value {
        json!({
            "attendeeId": attendee_id,
            "eventId": event_id,
            "ticketsBooked": tickets,
            "paymentInfo": { "amount": 30.0 * tickets as f64 }
        })
    }

    #[tokio::test]
    async fn test_book_expand_and_adjust() {
        let cluster = cluster_with(None).await;
        let (event_id, attendee_id) = seed(&cluster, 5, true).await;
        let admin = bearer("Admin");

        let (status, body) = call(&cluster.tickets, Method::POST, "/api/tickets", Some(&admin), Some(booking(&attendee_id, &event_id, 3))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "ticket successfully booked");
        assert_eq!(body["ticketBooking"]["ticketsBooked"], 3);
        assert!(body["ticketBooking"]["paymentReference"].as_str().unwrap().starts_with("txn_"));
        let booking_id = body["ticketBooking"]["id"].as_str().unwrap().to_string();

        let (_, event) = call(&cluster.events, Method::GET, &format!("/api/events/{}", event_id), Some(&admin), None).await;
        assert_eq!(event["ticketAvailability"], 2);

        let (status, body) = call(&cluster.tickets, Method::GET, &format!("/api/tickets/{}", booking_id), Some(&bearer("User")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event"]["ticketAvailability"], 2);
        assert_eq!(body["attendee"]["email"], "ada@example.com");

        let (status, body) = call(&cluster.tickets, Method::GET, "/api/tickets", Some(&bearer("User")), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = call(
            &cluster.tickets,
            Method::PATCH,
            "/api/tickets/updateTickets",
            Some(&admin),
            Some(json!({"ticketBookingId": booking_id, "tickets": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "updated");
        assert_eq!(body["ticket"]["ticketsBooked"], 5);

        let (status, body) = call(
            &cluster.tickets,
            Method::PATCH,
            "/api/tickets/updateTickets",
            Some(&admin),
            Some(json!({"ticketBookingId": booking_id, "tickets": i64::MAX})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_booking_failures_map_to_status_codes() {
        let cluster = cluster_with(None).await;
        let (event_id, attendee_id) = seed(&cluster, 5, false).await;
        let admin = bearer("Admin");

        let (status, body) = call(&cluster.tickets, Method::POST, "/api/tickets", Some(&admin), Some(booking(&attendee_id, &event_id, 10))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INSUFFICIENT_AVAILABILITY");

        let (status, body) = call(&cluster.tickets, Method::POST, "/api/tickets", Some(&admin), Some(booking(&attendee_id, &event_id, 1))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "NOT_REGISTERED");

        let (status, body) = call(&cluster.tickets, Method::POST, "/api/tickets", Some(&admin), Some(booking(&attendee_id, &event_id, 0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_REQUEST");

        let (status, body) = call(&cluster.tickets, Method::POST, "/api/tickets", Some(&admin), Some(booking(&attendee_id, "missing", 1))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");

        let (_, body) = call(&cluster.tickets, Method::GET, "/api/tickets", Some(&admin), None).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_service_down_is_bad_gateway() {
        let cluster = cluster_with(Some("http://127.0.0.1:1".to_string())).await;
        let (_, attendee_id) = seed(&cluster, 5, true).await;

        let (status, body) = call(&cluster.tickets, Method::POST, "/api/tickets", Some(&bearer("Admin")), Some(booking(&attendee_id, "E1", 1))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "REMOTE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_unresolved_references_render_null() {
        let cluster = cluster_with(None).await;
        let (event_id, attendee_id) = seed(&cluster, 5, true).await;
        let admin = bearer("Admin");

        let (_, body) = call(&cluster.tickets, Method::POST, "/api/tickets", Some(&admin), Some(booking(&attendee_id, &event_id, 5))).await;
        let booking_id = body["ticketBooking"]["id"].as_str().unwrap().to_string();

        let mut config = cluster.config.clone();
        config.remote.event_service_url = "http://127.0.0.1:1".to_string();
        let degraded = ticket_app(&config, cluster.bookings.clone());

        let (status, body) = call(&degraded, Method::GET, &format!("/api/tickets/{}", booking_id), Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["event"].is_null());
        assert_eq!(body["attendee"]["id"], attendee_id.as_str());
        assert_eq!(body["ticketsBooked"], 5);

        let (status, _) = call(&degraded, Method::GET, "/api/tickets/unknown", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
