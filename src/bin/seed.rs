use argon2::{
    Argon2, PasswordHasher,
    password_hash::{rand_core::OsRng, SaltString},
};
use chrono::{Duration, Utc};
use storefront_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123", "user").await?;
    seed_catalog(&pool).await?;
    seed_discounts(&pool).await?;
    seed_banners(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, brand, price, original_price, stock, variants)
    let products: Vec<(&str, &str, &str, i64, i64, i32, Vec<(&str, i64, i32)>)> = vec![
        (
            "Trail Hoodie",
            "Brushed fleece hoodie for cold mornings",
            "Northpeak",
            550_000,
            650_000,
            50,
            vec![("Size M", 0, 20), ("Size L", 0, 20), ("Size XL", 25_000, 10)],
        ),
        (
            "Ceramic Pour-Over Mug",
            "Double-walled mug, keeps coffee warm",
            "Brewline",
            120_000,
            120_000,
            100,
            vec![],
        ),
        (
            "Canvas Tote",
            "Heavy canvas tote with inner pocket",
            "Northpeak",
            90_000,
            110_000,
            200,
            vec![("Natural", 0, 120), ("Charcoal", 5_000, 80)],
        ),
        (
            "Field Notebook 3-Pack",
            "Dot-grid pocket notebooks",
            "Papertrail",
            75_000,
            75_000,
            150,
            vec![],
        ),
    ];

    for (name, desc, brand, price, original_price, stock, variants) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, brand, price, original_price, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(brand)
        .bind(price)
        .bind(original_price)
        .bind(stock)
        .execute(pool)
        .await?;

        let (product_id,): (Uuid,) = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await?;

        for (variant_name, price_modifier, variant_stock) in variants {
            sqlx::query(
                r#"
                INSERT INTO product_variants (id, product_id, name, price_modifier, stock)
                SELECT $1, $2, $3, $4, $5
                WHERE NOT EXISTS (
                    SELECT 1 FROM product_variants WHERE product_id = $2 AND name = $3
                )
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(variant_name)
            .bind(price_modifier)
            .bind(variant_stock)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded catalog");
    Ok(())
}

async fn seed_discounts(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let start = Utc::now() - Duration::days(1);
    let end = Utc::now() + Duration::days(30);

    sqlx::query(
        r#"
        INSERT INTO discounts
            (id, name, discount_type, discount_value, min_purchase_amount,
             max_discount_amount, start_date, end_date)
        SELECT $1, $2, $3, $4, $5, $6, $7, $8
        WHERE NOT EXISTS (SELECT 1 FROM discounts WHERE name = $2)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("Launch 10% off")
    .bind("percentage")
    .bind(10_i64)
    .bind(Option::<i64>::None)
    .bind(Some(100_000_i64))
    .bind(start)
    .bind(end)
    .execute(pool)
    .await?;

    println!("Seeded discounts");
    Ok(())
}

async fn seed_banners(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let banners = [
        ("New season drop", "/banners/new-season.jpg", Some("/collections/new"), 0),
        ("Free shipping over 500k", "/banners/free-shipping.jpg", None, 1),
    ];

    for (title, image_url, link_url, position) in banners {
        sqlx::query(
            r#"
            INSERT INTO banners (id, title, image_url, link_url, position)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (SELECT 1 FROM banners WHERE title = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(image_url)
        .bind(link_url)
        .bind(position)
        .execute(pool)
        .await?;
    }

    println!("Seeded banners");
    Ok(())
}
