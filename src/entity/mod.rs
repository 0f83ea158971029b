pub mod analytics_events;
pub mod banners;
pub mod cart_items;
pub mod discounts;
pub mod order_items;
pub mod orders;
pub mod product_variants;
pub mod products;
pub mod users;
pub mod wishlist_items;

pub use analytics_events::Entity as AnalyticsEvents;
pub use banners::Entity as Banners;
pub use cart_items::Entity as CartItems;
pub use discounts::Entity as Discounts;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_variants::Entity as ProductVariants;
pub use products::Entity as Products;
pub use users::Entity as Users;
pub use wishlist_items::Entity as WishlistItems;
