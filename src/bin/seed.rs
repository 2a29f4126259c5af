use ancestral_heartbeat::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    services::auth_service::hash_password,
};
use chrono::{Duration, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

struct SeedProduct {
    name_es: &'static str,
    name_en: &'static str,
    description_es: &'static str,
    description_en: &'static str,
    category: &'static str,
    color: &'static str,
    price: i64,
    stock: i32,
    rating: f64,
    variants: &'static [(&'static str, i64, i32)],
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name_es: "Mochila Wayuu",
        name_en: "Wayuu Mochila Bag",
        description_es: "Tejida a mano en crochet por artesanas de La Guajira.",
        description_en: "Hand-crocheted by artisans from La Guajira.",
        category: "bolsos",
        color: "multicolor",
        price: 180_000,
        stock: 25,
        rating: 4.9,
        variants: &[("Pequeña", -40_000, 10), ("Grande", 60_000, 8)],
    },
    SeedProduct {
        name_es: "Sombrero Vueltiao",
        name_en: "Vueltiao Hat",
        description_es: "Caña flecha trenzada, 19 vueltas.",
        description_en: "Braided caña flecha, 19 turns.",
        category: "sombreros",
        color: "negro",
        price: 150_000,
        stock: 30,
        rating: 4.8,
        variants: &[("15 vueltas", -30_000, 12), ("21 vueltas", 90_000, 4)],
    },
    SeedProduct {
        name_es: "Hamaca de San Jacinto",
        name_en: "San Jacinto Hammock",
        description_es: "Algodón tejido en telar vertical.",
        description_en: "Cotton woven on a vertical loom.",
        category: "hogar",
        color: "rojo",
        price: 320_000,
        stock: 6,
        rating: 4.7,
        variants: &[],
    },
    SeedProduct {
        name_es: "Vasija de La Chamba",
        name_en: "La Chamba Pot",
        description_es: "Cerámica negra bruñida del Tolima.",
        description_en: "Burnished black pottery from Tolima.",
        category: "ceramica",
        color: "negro",
        price: 95_000,
        stock: 3,
        rating: 4.6,
        variants: &[],
    },
    SeedProduct {
        name_es: "Mola Guna",
        name_en: "Guna Mola",
        description_es: "Aplicación textil en capas, diseño tradicional.",
        description_en: "Layered reverse-appliqué textile, traditional design.",
        category: "textiles",
        color: "multicolor",
        price: 120_000,
        stock: 15,
        rating: 4.5,
        variants: &[],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ancestral_heartbeat=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool();

    let admin_id = ensure_user_with_role(pool, "admin@example.com", "admin12345", "admin").await?;
    let manager_id =
        ensure_user_with_role(pool, "manager@example.com", "manager12345", "store_manager").await?;
    let customer_id =
        ensure_user_with_role(pool, "cliente@example.com", "cliente12345", "customer").await?;
    seed_products(pool).await?;
    seed_coupons(pool).await?;

    tracing::info!(%admin_id, %manager_id, %customer_id, "seed completed");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
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
    .fetch_one(pool)
    .await?;

    tracing::info!(email, role, "ensured user");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for product in PRODUCTS {
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, name_es, name_en, description_es, description_en,
                                  category, color, price, stock, rating)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (name_es) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name_es)
        .bind(product.name_en)
        .bind(product.description_es)
        .bind(product.description_en)
        .bind(product.category)
        .bind(product.color)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.rating)
        .fetch_optional(pool)
        .await?;

        let Some((product_id,)) = inserted else {
            continue;
        };
        for (name, modifier, stock) in product.variants {
            sqlx::query(
                "INSERT INTO product_variants (id, product_id, name, price_modifier, stock) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(*name)
            .bind(*modifier)
            .bind(*stock)
            .execute(pool)
            .await?;
        }
    }

    tracing::info!(count = PRODUCTS.len(), "seeded products");
    Ok(())
}

async fn seed_coupons(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let in_a_year = Utc::now() + Duration::days(365);
    let coupons: [(&str, &str, i64, i64, Option<i64>); 3] = [
        ("BIENVENIDO10", "percentage", 10, 0, None),
        ("ARTESANO20", "percentage", 20, 200_000, Some(80_000)),
        ("ENVIOGRATIS", "fixed", 15_000, 100_000, None),
    ];

    for (code, kind, value, min_purchase, cap) in coupons {
        sqlx::query(
            r#"
            INSERT INTO coupons (id, code, kind, value, min_purchase, max_discount_amount, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(kind)
        .bind(value)
        .bind(min_purchase)
        .bind(cap)
        .bind(in_a_year)
        .execute(pool)
        .await?;
    }

    tracing::info!("seeded coupons");
    Ok(())
}
