use axum::routing::{delete, get, post};
use axum::Router;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{account, checkout, events, health_check, staff};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events/:id/publish", post(events::publish_event))
        .route("/events/:id/publish-status", post(events::set_publish_status))
        .route("/events/:id", delete(events::creator_delete_event))
        .route("/checkout/sessions", post(checkout::create_checkout_session))
        .route(
            "/checkout/sessions/:id/finalize",
            post(checkout::finalize_checkout_session),
        )
        .route("/orders/free", post(checkout::create_free_order))
        .route("/account", delete(account::delete_account))
        .route(
            "/staff/events/:id/moderation",
            post(staff::set_moderation_status),
        )
        .route("/staff/events/:id", delete(staff::staff_delete_event))
        .route("/staff/users/:id", delete(staff::staff_delete_user))
        .route("/staff/users/:id/role", post(staff::set_user_role))
        .route("/staff/users/:id/blocked", post(staff::set_user_blocked))
        .route(
            "/staff/maintenance/backfill-emails",
            post(staff::backfill_profile_emails),
        )
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
