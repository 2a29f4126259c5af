use axum::Router;

use crate::state::AppState;

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod coupons;
pub mod doc;
pub mod health;
pub mod loyalty;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod products;
pub mod vendor;
pub mod wishlist;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/account", account::router())
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/coupons", coupons::router())
        .nest("/orders", orders::router())
        .nest("/wishlist", wishlist::router())
        .nest("/loyalty", loyalty::router())
        .nest("/notifications", notifications::router())
        .nest("/vendor", vendor::router())
        .nest("/admin", admin::router())
}
