//! Storefront server configuration

use crate::BoxError;

/// Storefront server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// SES sender email address
    pub ses_from_email: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// JWT secret for the admin API
    pub jwt_secret: String,
    /// ISO currency code for charges
    pub currency: String,
    /// Public storefront URL, used for checkout redirects
    pub storefront_url: String,
    /// Allowed CORS origin (defaults to the storefront URL)
    pub cors_origin: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let storefront_url = std::env::var("STOREFRONT_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:3000".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "orders@storefront.local".into()),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            currency: std::env::var("CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "usd".into()),
            cors_origin: std::env::var("CORS_ORIGIN").unwrap_or_else(|_| storefront_url.clone()),
            storefront_url,
        })
    }
}
