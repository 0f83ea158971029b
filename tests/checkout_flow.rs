use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use storefront_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::{CheckoutRequest, UpdateOrderStatusRequest},
    },
    entity::{
        discounts::{ActiveModel as DiscountActive, DiscountType},
        products::{ActiveModel as ProductActive, Entity as Products},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    routes::admin::LowStockQuery,
    services::{admin_service, cart_service, order_service},
    state::AppState,
};
use uuid::Uuid;

// Full storefront flow: cart mutations, discounted checkout inside one
// transaction, admin status updates and low-stock reporting.
#[tokio::test]
async fn cart_checkout_and_admin_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "user@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test Widget".into()),
        description: Set(Some("A product for testing".into())),
        brand: Set(None),
        price: Set(1000),
        original_price: Set(1000),
        stock: Set(10),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Active, global, uncapped 10% off. The minimum equals the checkout
    // subtotal below; the bound is inclusive so the discount still applies.
    let percent_discount = DiscountActive {
        id: Set(Uuid::new_v4()),
        name: Set("Ten percent".into()),
        discount_type: Set(DiscountType::Percentage),
        discount_value: Set(10),
        min_purchase_amount: Set(Some(2000)),
        max_discount_amount: Set(None),
        start_date: Set((Utc::now() - Duration::days(1)).into()),
        end_date: Set((Utc::now() + Duration::days(1)).into()),
        is_active: Set(true),
        is_global: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    // Adding the same product twice increments the existing line.
    cart_service::add_to_cart(
        &state.pool,
        &auth_user,
        AddToCartRequest {
            product_id: product.id,
            variant_id: None,
            quantity: 1,
        },
    )
    .await?;
    let added = cart_service::add_to_cart(
        &state.pool,
        &auth_user,
        AddToCartRequest {
            product_id: product.id,
            variant_id: None,
            quantity: 2,
        },
    )
    .await?;
    let cart_item = added.data.unwrap();
    assert_eq!(cart_item.quantity, 3);

    // Set the line back to 2; the cart reflects live pricing.
    cart_service::update_cart_item(
        &state.pool,
        &auth_user,
        UpdateCartItemRequest {
            item_id: cart_item.id,
            quantity: 2,
        },
    )
    .await?;

    let cart = cart_service::get_cart(&state.pool, &auth_user).await?;
    let cart = cart.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.subtotal, 2000);
    assert_eq!(cart.item_count, 2);

    // Checkout: subtotal 2000 meets the 2000 minimum exactly, so the 10%
    // discount applies. Discount 200, total 1800.
    let checkout_resp = order_service::checkout(
        &state,
        &auth_user,
        CheckoutRequest {
            shipping_address: "1 Example Street".into(),
            payment_method: "cash".into(),
        },
    )
    .await?;
    let placed = checkout_resp.data.unwrap();
    assert_eq!(placed.order.subtotal, 2000);
    assert_eq!(placed.order.discount_applied, 200);
    assert_eq!(placed.order.total_amount, 1800);
    assert_eq!(
        placed.order.total_amount,
        placed.order.subtotal - placed.order.discount_applied
    );
    assert_eq!(placed.order.status, "pending");
    assert!(placed.order.order_number.starts_with("ORD-"));

    // Order items carry the frozen unit price and reconcile with the subtotal.
    let items_total: i64 = placed
        .items
        .iter()
        .map(|item| item.price * item.quantity as i64)
        .sum();
    assert_eq!(items_total, placed.order.subtotal);

    // Cart is cleared by the checkout transaction.
    let cart_after = cart_service::get_cart(&state.pool, &auth_user).await?;
    let cart_after = cart_after.data.unwrap();
    assert!(cart_after.items.is_empty());
    assert_eq!(cart_after.subtotal, 0);

    // Empty cart cannot be checked out.
    let empty_checkout = order_service::checkout(
        &state,
        &auth_user,
        CheckoutRequest {
            shipping_address: "1 Example Street".into(),
            payment_method: "cash".into(),
        },
    )
    .await;
    assert!(empty_checkout.is_err());

    // Lookup works by order number as well as UUID.
    let by_number =
        order_service::get_order(&state, &auth_user, &placed.order.order_number).await?;
    assert_eq!(by_number.data.unwrap().order.id, placed.order.id);

    // Admin moves the order to shipped; a bogus status is rejected and
    // leaves the order unchanged.
    let updated = admin_service::update_order_status(
        &state,
        &auth_admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?;
    assert_eq!(updated.data.unwrap().status, "shipped");

    let bogus = admin_service::update_order_status(
        &state,
        &auth_admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: "bogus".into(),
        },
    )
    .await;
    assert!(bogus.is_err());
    let unchanged =
        order_service::get_order(&state, &auth_admin, &placed.order.id.to_string()).await?;
    assert_eq!(unchanged.data.unwrap().order.status, "shipped");

    // Stock went from 10 to 8; low-stock with threshold 10 includes it.
    let low = admin_service::list_low_stock(
        &state,
        &auth_admin,
        LowStockQuery {
            page: Some(1),
            per_page: Some(20),
            threshold: Some(10),
        },
    )
    .await?;
    assert!(
        low.data.unwrap().items.iter().any(|p| p.id == product.id),
        "expected product to appear in low-stock list"
    );

    // Ordering more than the remaining stock fails and rolls back.
    cart_service::add_to_cart(
        &state.pool,
        &auth_user,
        AddToCartRequest {
            product_id: product.id,
            variant_id: None,
            quantity: 100,
        },
    )
    .await?;
    let oversell = order_service::checkout(
        &state,
        &auth_user,
        CheckoutRequest {
            shipping_address: "1 Example Street".into(),
            payment_method: "cash".into(),
        },
    )
    .await;
    assert!(oversell.is_err());

    let after = Products::find_by_id(product.id)
        .one(&state.orm)
        .await?
        .expect("product still exists");
    assert_eq!(after.stock, 8, "failed checkout must not decrement stock");

    let cart_kept = cart_service::get_cart(&state.pool, &auth_user).await?;
    let cart_kept = cart_kept.data.unwrap();
    assert_eq!(
        cart_kept.items.len(),
        1,
        "failed checkout must not clear the cart"
    );

    // A fixed discount larger than the subtotal clamps to it: the order
    // total bottoms out at zero, never negative.
    let mut deactivate: DiscountActive = percent_discount.into();
    deactivate.is_active = Set(false);
    deactivate.update(&state.orm).await?;

    DiscountActive {
        id: Set(Uuid::new_v4()),
        name: Set("Five thousand off".into()),
        discount_type: Set(DiscountType::Fixed),
        discount_value: Set(5000),
        min_purchase_amount: Set(None),
        max_discount_amount: Set(None),
        start_date: Set((Utc::now() - Duration::days(1)).into()),
        end_date: Set((Utc::now() + Duration::days(1)).into()),
        is_active: Set(true),
        is_global: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    cart_service::update_cart_item(
        &state.pool,
        &auth_user,
        UpdateCartItemRequest {
            item_id: cart_kept.items[0].id,
            quantity: 1,
        },
    )
    .await?;

    let clamped = order_service::checkout(
        &state,
        &auth_user,
        CheckoutRequest {
            shipping_address: "1 Example Street".into(),
            payment_method: "cash".into(),
        },
    )
    .await?;
    let clamped = clamped.data.unwrap();
    assert_eq!(clamped.order.subtotal, 1000);
    assert_eq!(clamped.order.discount_applied, 1000);
    assert_eq!(clamped.order.total_amount, 0);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE analytics_events, order_items, orders, cart_items, wishlist_items, \
         discounts, banners, product_variants, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState { pool, orm })
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
