//! Application state and HTTP routing

use crate::auth::{
    api as auth_api, auth_middleware, AuthGate, BcryptHasher, CredentialStore, JwtHandler,
    PasswordHasher, TokenIssuer,
};
use crate::db::Database;
use crate::middleware::request_logging;
use crate::notes::{api as notes_api, NoteStore, OwnershipValidator};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared handler state. Everything behind an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub notes: Arc<dyn NoteStore>,
    pub ownership: Arc<OwnershipValidator>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        notes: Arc<dyn NoteStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            gate: Arc::new(AuthGate::new(users, hasher, tokens)),
            ownership: Arc::new(OwnershipValidator::new(notes.clone())),
            notes,
        }
    }

    /// Production wiring: SQLite for storage, bcrypt for passwords, HS256 JWTs
    pub fn from_database(db: Database, jwt: JwtHandler) -> Self {
        let db = Arc::new(db);
        Self::new(
            db.clone(),
            db,
            Arc::new(BcryptHasher),
            Arc::new(jwt),
        )
    }
}

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/api/notes",
            get(notes_api::list_notes).post(notes_api::create_note),
        )
        .route(
            "/api/notes/:id",
            get(notes_api::get_note)
                .put(notes_api::update_note)
                .delete(notes_api::delete_note),
        )
        .route(
            "/api/folders",
            get(notes_api::list_folders).post(notes_api::create_folder),
        )
        .route(
            "/api/tags",
            get(notes_api::list_tags).post(notes_api::create_tag),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/login", post(auth_api::login))
        .route("/api/login/refresh", post(auth_api::refresh))
        .route("/api/users", post(auth_api::register));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health_check() -> &'static str {
    "OK"
}
