use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::system::auth::middleware::{require_admin, require_auth};
use crate::system::middleware::request_logger::request_logger;
use crate::{handlers, system};

/// Every route of the API, with CORS and request logging applied
pub fn configure_routes() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(public_auth_routes())
        .merge(user_admin_routes())
        .merge(business_routes())
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
}

fn public_auth_routes() -> Router {
    Router::new()
        .route("/api/system/auth/login", post(system::handlers::auth::login))
        .route("/api/system/auth/refresh", post(system::handlers::auth::refresh))
        .route("/api/system/auth/logout", post(system::handlers::auth::logout))
}

fn user_admin_routes() -> Router {
    Router::new()
        .route(
            "/api/system/users",
            get(system::handlers::users::list).post(system::handlers::users::create),
        )
        .route(
            "/api/system/users/:id",
            get(system::handlers::users::get_by_id)
                .put(system::handlers::users::update)
                .delete(system::handlers::users::delete),
        )
        .route_layer(middleware::from_fn(require_admin))
}

/// Authenticated routes; each handler checks its own permission
fn business_routes() -> Router {
    Router::new()
        .route("/api/system/auth/me", get(system::handlers::auth::current_user))
        .route(
            "/api/system/users/:id/change-password",
            post(system::handlers::users::change_password),
        )
        // a001 leads
        .route(
            "/api/leads",
            get(handlers::a001_lead::list).post(handlers::a001_lead::create),
        )
        .route("/api/leads/follow-ups", get(handlers::a001_lead::follow_ups))
        .route(
            "/api/leads/:id",
            get(handlers::a001_lead::get_by_id)
                .put(handlers::a001_lead::update)
                .delete(handlers::a001_lead::delete),
        )
        .route("/api/leads/:id/stage", post(handlers::a001_lead::change_stage))
        // a002 customers
        .route(
            "/api/customers",
            get(handlers::a002_customer::list).post(handlers::a002_customer::create),
        )
        .route("/api/customers/search", get(handlers::a002_customer::search))
        .route(
            "/api/customers/uptime-pass/refresh",
            post(handlers::a002_customer::refresh_passes),
        )
        .route(
            "/api/customers/:id",
            get(handlers::a002_customer::get_by_id)
                .put(handlers::a002_customer::update)
                .delete(handlers::a002_customer::delete),
        )
        .route(
            "/api/customers/:id/uptime-pass",
            post(handlers::a002_customer::renew_uptime_pass),
        )
        // a003 inventory
        .route(
            "/api/inventory",
            get(handlers::a003_inventory_item::list).post(handlers::a003_inventory_item::create),
        )
        .route(
            "/api/inventory/low-stock",
            get(handlers::a003_inventory_item::low_stock),
        )
        .route(
            "/api/inventory/:id",
            get(handlers::a003_inventory_item::get_by_id)
                .put(handlers::a003_inventory_item::update)
                .delete(handlers::a003_inventory_item::delete),
        )
        .route(
            "/api/inventory/:id/receive",
            post(handlers::a003_inventory_item::receive),
        )
        // a004 sales
        .route(
            "/api/sales",
            get(handlers::a004_sale::list).post(handlers::a004_sale::create),
        )
        .route("/api/sales/:id", get(handlers::a004_sale::get_by_id))
        .route(
            "/api/sales/:id/payments",
            post(handlers::a004_sale::record_payment),
        )
        // a005 payments
        .route("/api/payments", get(handlers::a005_payment::list))
        .route("/api/payments/summary", get(handlers::a005_payment::summary))
        // a006 referrals
        .route(
            "/api/referrals",
            get(handlers::a006_referral::list).post(handlers::a006_referral::create),
        )
        .route(
            "/api/referrals/:id/reward",
            post(handlers::a006_referral::mark_rewarded),
        )
        .route("/api/referrals/:id/cancel", post(handlers::a006_referral::cancel))
        // a007 service tickets
        .route(
            "/api/service-tickets",
            get(handlers::a007_service_ticket::list).post(handlers::a007_service_ticket::create),
        )
        .route(
            "/api/service-tickets/:id",
            get(handlers::a007_service_ticket::get_by_id).put(handlers::a007_service_ticket::update),
        )
        .route(
            "/api/service-tickets/:id/assign",
            post(handlers::a007_service_ticket::assign),
        )
        .route(
            "/api/service-tickets/:id/status",
            post(handlers::a007_service_ticket::change_status),
        )
        .route(
            "/api/service-tickets/:id/parts",
            post(handlers::a007_service_ticket::add_part),
        )
        .route(
            "/api/service-tickets/:id/close",
            post(handlers::a007_service_ticket::close),
        )
        // a008 attendance
        .route("/api/attendance", get(handlers::a008_attendance::list))
        .route(
            "/api/attendance/check-in",
            post(handlers::a008_attendance::check_in),
        )
        .route(
            "/api/attendance/check-out",
            post(handlers::a008_attendance::check_out),
        )
        .route("/api/attendance/mark", post(handlers::a008_attendance::mark))
        .route(
            "/api/attendance/summary",
            get(handlers::a008_attendance::summary),
        )
        // d400 dashboard
        .route(
            "/api/d400/summary",
            get(handlers::d400_dealership_summary::get_summary),
        )
        .route_layer(middleware::from_fn(require_auth))
}
