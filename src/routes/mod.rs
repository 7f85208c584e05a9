use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod health;
pub mod journals;
pub mod production;
pub mod reviews;
pub mod submissions;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/register", post(auth::register));

    let journals_routes = Router::new()
        .route(
            "/",
            get(journals::list_journals).post(journals::create_journal),
        )
        .route("/:id", patch(journals::update_journal));

    let submissions_routes = Router::new()
        .route(
            "/",
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route("/:id", get(submissions::get_submission))
        .route("/:id/decision", post(submissions::record_editor_decision))
        .route("/:id/withdraw", post(submissions::withdraw_submission));

    let reviews_routes = Router::new()
        .route(
            "/rounds",
            get(reviews::list_rounds).post(reviews::create_round),
        )
        .route("/assignments", post(reviews::create_assignment))
        .route("/:id/respond", patch(reviews::respond_to_assignment))
        .route("/:id/complete", post(reviews::complete_assignment));

    let production_routes =
        Router::new().route("/:id/publish", post(production::publish_submission));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/journals", journals_routes)
        .nest("/api/submissions", submissions_routes)
        .nest("/api/reviews", reviews_routes)
        .nest("/api/production", production_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
}
