use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::Config;
use storefront::db::{self, AppState, queries};
use storefront::email::EmailService;
use storefront::payments::StripeClient;

#[derive(Parser)]
#[command(name = "storefront", version, about = "Storefront backend with Stripe checkout")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    let default_filter = if config.dev_mode {
        "storefront=debug,tower_http=debug"
    } else {
        "storefront=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::InitDb => {
            db::create_pool(&config.database_path)
                .with_context(|| format!("failed to initialize {}", config.database_path))?;
            tracing::info!(path = %config.database_path, "Database initialized");
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path))?;

    {
        let conn = pool.get()?;
        let purged = queries::purge_expired_sessions(&conn, config.session_ttl_days)?;
        if purged > 0 {
            tracing::info!(count = purged, "Purged expired sessions");
        }
    }

    if config.stripe_secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set, checkout requests will fail");
    }
    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, all webhooks will be rejected");
    }
    if config.resend_api_key.is_none() && config.email_webhook_url.is_none() {
        tracing::warn!("No RESEND_API_KEY or EMAIL_WEBHOOK_URL set, order emails will be skipped");
    }

    let payments = StripeClient::new(&config.stripe_api_base, config.stripe_secret_key.clone())?;
    let from = format!("{} <{}>", config.shop_name, config.email_from);
    let mailer = EmailService::new(
        config.resend_api_key.clone(),
        from,
        config.email_webhook_url.clone(),
    )?;

    let state = AppState::from_config(&config, pool, Arc::new(payments), Arc::new(mailer));
    if !state.admin.is_enabled() {
        tracing::warn!("ADMIN_PASSWORD not set, admin login is disabled");
    }
    let app = storefront::app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(addr = %addr, base_url = %config.base_url, "Storefront listening");

    axum::serve(listener, app).await?;
    Ok(())
}
