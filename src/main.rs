use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use storefront::app;
use storefront::models::Role;
use storefront::services::password::hash_password;
use storefront::utils::static_object::{IS_PRODUCTION, PORT, SEED_ADMIN, SEED_USER, SeedAccount};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront=info,tower_http=info".into());

    if *IS_PRODUCTION {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new(
                "storefront".into(),
                std::io::stdout,
            ))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Creates the account unless its email is already taken.
async fn seed_account(
    db_pool: &PgPool,
    name: &str,
    account: &SeedAccount,
    role: Role,
) -> Result<(), Box<dyn std::error::Error>> {
    let password_hash = hash_password(&account.password)?;
    let created = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, provider, role)
        VALUES ($1, $2, $3, 'local', $4)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(&account.email)
    .bind(&password_hash)
    .bind(role)
    .execute(db_pool)
    .await?
    .rows_affected();

    if created > 0 {
        info!(email = %account.email, %role, "Seed account created");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let database_url =
        std::env::var("DATABASE_URL").expect("Env variable `DATABASE_URL` should be set");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    for (name, account, role) in [
        ("Admin", &*SEED_ADMIN, Role::Admin),
        ("User", &*SEED_USER, Role::User),
    ] {
        if let Err(e) = seed_account(&db_pool, name, account, role).await {
            error!(error = %e, email = %account.email, "Failed to seed account");
        }
    }

    let app = app(db_pool);

    let addr = format!("0.0.0.0:{}", *PORT);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind the listen address");
    info!("Server starting at http://{addr}");

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
