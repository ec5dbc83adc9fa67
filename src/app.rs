use crate::{api, auth::AuthHook};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub hook: Arc<dyn AuthHook>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/-/ping", get(api::ping))
        .route("/authenticate", post(api::authenticate))
        .route("/adduser", post(api::add_user))
        .route("/change-password", post(api::change_password))
        .route("/allow-access", post(api::allow_access))
        .route("/allow-publish", post(api::allow_publish))
        .route("/allow-unpublish", post(api::allow_unpublish))
        .with_state(state)
}
