use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    /// Fixed settlement currency for every checkout session
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub shop_name: String,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    /// POST emails here instead of sending them via Resend
    pub email_webhook_url: Option<String>,
    /// Recipient of sale alerts (None = no admin alerts)
    pub admin_email: Option<String>,
    pub admin_username: String,
    pub admin_password: Option<String>,
    /// Days of inactivity before a session (and its cart) is purged
    pub session_ttl_days: i64,
    pub cookie_secure: bool,
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("STOREFRONT_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let success_url = env::var("CHECKOUT_SUCCESS_URL")
            .unwrap_or_else(|_| format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", base_url));
        let cancel_url = env::var("CHECKOUT_CANCEL_URL")
            .unwrap_or_else(|_| format!("{}/checkout-test.html", base_url));

        let session_ttl_days: i64 = env::var("SESSION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "storefront.db".to_string()),
            base_url,
            dev_mode,
            stripe_secret_key: env_opt("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: env_opt("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            currency: env::var("CHECKOUT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "chf".to_string()),
            success_url,
            cancel_url,
            shop_name: env::var("SHOP_NAME").unwrap_or_else(|_| "Storefront".to_string()),
            resend_api_key: env_opt("RESEND_API_KEY"),
            email_from: env::var("EMAIL_FROM").unwrap_or_else(|_| "orders@localhost".to_string()),
            email_webhook_url: env_opt("EMAIL_WEBHOOK_URL"),
            admin_email: env_opt("ADMIN_EMAIL"),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env_opt("ADMIN_PASSWORD"),
            session_ttl_days,
            cookie_secure: env_flag("COOKIE_SECURE", false),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
