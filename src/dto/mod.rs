pub mod auth;
pub mod banners;
pub mod cart;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod wishlist;
