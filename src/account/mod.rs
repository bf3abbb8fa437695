pub mod commands;
pub mod service;

pub use service::{AccountService, Reconciliation};

use axum::Router;
use axum::routing::{get, patch, post};
use axum_login::login_required;

pub fn router() -> Router<crate::StateType> {
    let gated = Router::new()
        .route("/me", get(commands::me))
        .route("/account/username", patch(commands::update_username))
        .route("/account/email", patch(commands::update_email))
        .route("/account/password", patch(commands::update_password))
        .route_layer(login_required!(crate::BackendType));

    Router::new()
        .route("/register", post(commands::register))
        .route("/login", post(commands::login))
        .route("/logout", post(commands::logout))
        .merge(gated)
}
