pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod coupons;
pub mod loyalty;
pub mod orders;
pub mod products;
pub mod vendor;
pub mod wishlist;
