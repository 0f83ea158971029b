use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, UserList, UserView},
        banners::{BannerList, CreateBannerRequest, UpdateBannerRequest},
        cart::{AddToCartRequest, CartLineDto, CartView, UpdateCartItemRequest},
        discounts::{CreateDiscountRequest, DiscountList, UpdateDiscountRequest},
        orders::{CheckoutRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            CreateProductRequest, CreateVariantRequest, ProductDetail, ProductList,
            UpdateProductRequest,
        },
        wishlist::{AddWishlistRequest, WishlistProductList},
    },
    models::{
        Banner, CartItem, Discount, DiscountType, Order, OrderItem, Product, ProductVariant,
        WishlistItem,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, banners, cart, discounts, health, orders, params, products, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::add_variant,
        products::delete_variant,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::update_order_status,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        discounts::list_discounts,
        discounts::create_discount,
        discounts::update_discount,
        discounts::delete_discount,
        banners::list_banners,
        banners::create_banner,
        banners::update_banner,
        banners::delete_banner,
        admin::list_users,
        admin::list_low_stock,
        admin::adjust_inventory,
    ),
    components(
        schemas(
            Product,
            ProductVariant,
            CartItem,
            WishlistItem,
            Order,
            OrderItem,
            Discount,
            DiscountType,
            Banner,
            UserView,
            UserList,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            CreateVariantRequest,
            ProductDetail,
            ProductList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartLineDto,
            CartView,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            AddWishlistRequest,
            WishlistProductList,
            CreateDiscountRequest,
            UpdateDiscountRequest,
            DiscountList,
            CreateBannerRequest,
            UpdateBannerRequest,
            BannerList,
            admin::LowStockQuery,
            admin::InventoryAdjustRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductDetail>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<DiscountList>,
            ApiResponse<BannerList>,
            ApiResponse<UserList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Discounts", description = "Discount management endpoints"),
        (name = "Banners", description = "Banner merchandising endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
