use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use storefront::app::{build_router, AppState};
use storefront::config::load_config;
use storefront::gateway::{CheckoutGateway, StripeGateway, UnconfiguredGateway};
use storefront::sessions::hash_password;
use storefront::store::{memory::MemoryStore, pg::PgStore, Admin, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url).await?;
            info!("connected to postgres, migrations applied");
            Arc::new(pg)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway: Arc<dyn CheckoutGateway> = match &config.stripe_secret_key {
        Some(secret) => {
            info!("stripe gateway configured");
            Arc::new(StripeGateway::new(secret.clone(), config.frontend_url.clone()))
        }
        None => {
            warn!("stripe keys missing or placeholders, card checkout disabled");
            Arc::new(UnconfiguredGateway)
        }
    };

    bootstrap_admin(store.as_ref(), &config).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(store, gateway, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "storefront listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Seeds the first admin account on an empty admins table. The password comes
/// from ADMIN_PASSWORD; when that is unset a random one is generated and
/// logged once so the operator can log in and change it.
async fn bootstrap_admin(store: &dyn Store, config: &storefront::config::Config) -> anyhow::Result<()> {
    if store.admin_count().await? > 0 {
        return Ok(());
    }
    let password = match &config.bootstrap_admin_password {
        Some(p) => p.clone(),
        None => {
            let generated = Uuid::new_v4().simple().to_string();
            warn!(
                username = %config.bootstrap_admin_username,
                password = %generated,
                "no ADMIN_PASSWORD set, generated a one-time admin password"
            );
            generated
        }
    };
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("password hash: {e}"))?;
    store
        .create_admin(Admin {
            id: Uuid::new_v4(),
            username: config.bootstrap_admin_username.clone(),
            password_hash: hash,
            created_at: Utc::now(),
        })
        .await?;
    info!(username = %config.bootstrap_admin_username, "bootstrap admin created");
    Ok(())
}
