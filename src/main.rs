mod account;
mod backlog;
mod friends;
mod ident;
mod identity;
mod known_errors;
mod profile;
mod registry;
mod seed;
mod service;
mod store;
mod summary;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use axum_login::AuthManagerLayerBuilder;
use dotenvy::dotenv;
use std::env;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::identity::MemoryIdentityProvider;
use crate::service::MemoryService;
use seed::seed_dev_data;

type StateType = MemoryService;

type BackendType = MemoryIdentityProvider;

#[tokio::main]
async fn main() {
    dotenv().ok();

    if env::var("RUST_LOG").is_err() {
        unsafe {
            // Concurrent writing of set_var is not permitted,
            // but we're in main, so that shouldn't be a problem.
            env::set_var("RUST_LOG", "INFO");
        }
    }
    tracing_subscriber::fmt::init();

    let addr = env::var("SITE_ADDR").unwrap_or("0.0.0.0:3000".to_string());

    // registry, profiles, and backlog all share one in-memory document store
    let app_state = MemoryService::default();

    // dev users plus a pre-filled backlog for the first one
    seed_dev_data(&app_state)
        .await
        .expect("Failed to seed dev data");

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store);

    // sessions authenticate against the same identity provider the flows use
    let auth_layer =
        AuthManagerLayerBuilder::new(app_state.identity().clone(), session_layer).build();

    let app = Router::new()
        .route("/", get(Redirect::to("/articles")))
        .merge(account::router())
        .merge(backlog::router())
        .merge(friends::router())
        .merge(summary::router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(auth_layer);

    let app = app.with_state(app_state);

    // run our app with hyper
    println!("listening on http://{}", &addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind the tcp address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("failed to serve on the address");
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}
