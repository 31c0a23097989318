mod from_row;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::Config;
use crate::email::Mailer;
use crate::error::Result;
use crate::middleware::{AdminCredentials, SessionSettings};
use crate::notifications::NotificationSettings;
use crate::payments::{CheckoutSettings, PaymentGateway, WebhookVerifier};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Payment provider (Stripe in production)
    pub payments: Arc<dyn PaymentGateway>,
    /// Mail relay for order notifications
    pub mailer: Arc<dyn Mailer>,
    /// None when no webhook secret is configured; every webhook is then rejected
    pub webhook_verifier: Option<WebhookVerifier>,
    pub checkout: CheckoutSettings,
    pub notifications: NotificationSettings,
    pub admin: AdminCredentials,
    pub sessions: SessionSettings,
}

impl AppState {
    pub fn from_config(
        config: &Config,
        db: DbPool,
        payments: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            payments,
            mailer,
            webhook_verifier: config
                .stripe_webhook_secret
                .as_deref()
                .map(WebhookVerifier::new),
            checkout: CheckoutSettings {
                currency: config.currency.clone(),
                success_url: config.success_url.clone(),
                cancel_url: config.cancel_url.clone(),
            },
            notifications: NotificationSettings {
                shop_name: config.shop_name.clone(),
                admin_email: config.admin_email.clone(),
                currency: config.currency.clone(),
            },
            admin: AdminCredentials::new(
                &config.admin_username,
                config.admin_password.as_deref(),
            ),
            sessions: SessionSettings {
                ttl_days: config.session_ttl_days,
                cookie_secure: config.cookie_secure,
            },
        }
    }
}

fn init_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

/// Open a pool over the sqlite file at `path` and make sure the schema exists.
pub fn create_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(init_connection);
    let pool = Pool::builder().max_size(8).build(manager)?;
    let conn = pool.get()?;
    init_db(&conn)?;
    Ok(pool)
}

/// Single-connection in-memory pool. Every pooled connection to `:memory:`
/// is its own database, so the pool must never grow past one.
pub fn create_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory().with_init(init_connection);
    let pool = Pool::builder().max_size(1).build(manager)?;
    let conn = pool.get()?;
    init_db(&conn)?;
    Ok(pool)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            price_cents INTEGER NOT NULL CHECK (price_cents > 0),
            category TEXT,
            materials TEXT,
            image_url TEXT,
            available INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);

        CREATE TABLE IF NOT EXISTS heroes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hero_header TEXT NOT NULL,
            hero_title1 TEXT NOT NULL,
            hero_title2 TEXT NOT NULL,
            hero_title3 TEXT NOT NULL,
            target_url TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS hero_images (
            hero_id INTEGER NOT NULL REFERENCES heroes(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            data BLOB NOT NULL,
            PRIMARY KEY (hero_id, position)
        );

        CREATE TABLE IF NOT EXISTS gallery (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            avatar BLOB,
            avatar_type TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS gallery_images (
            gallery_id INTEGER NOT NULL REFERENCES gallery(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            data BLOB NOT NULL,
            PRIMARY KEY (gallery_id, position)
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            admin_user TEXT,
            created_at INTEGER NOT NULL,
            last_seen_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cart_items (
            session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 1),
            image_url TEXT,
            added_at INTEGER NOT NULL,
            PRIMARY KEY (session_id, product_id)
        );

        CREATE TABLE IF NOT EXISTS checkout_sessions (
            id TEXT PRIMARY KEY,
            cart_session_id TEXT,
            status TEXT NOT NULL,
            amount_total INTEGER,
            customer_email TEXT,
            created_at INTEGER NOT NULL,
            finalized_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_checkout_sessions_status ON checkout_sessions(status);
        "#,
    )?;
    Ok(())
}
