//! Application state for the storefront

use std::sync::Arc;

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;

use crate::BoxError;
use crate::checkout::CheckoutService;
use crate::config::Config;
use crate::email::{Mailer, SesMailer};
use crate::reconcile::Reconciler;
use crate::store::{PgStore, Store};
use crate::stripe::{PaymentGateway, StripeClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool (admin and read-only handlers)
    pub pool: PgPool,
    /// Store behind the money paths and discount code deletion
    pub store: Arc<dyn Store>,
    /// Single-product and cart checkout
    pub checkout: CheckoutService,
    /// Webhook-driven order finalization
    pub reconciler: Reconciler,
    /// Stripe (coupon mirroring from the admin API)
    pub gateway: Arc<dyn PaymentGateway>,
    /// Transactional email
    pub mailer: Arc<dyn Mailer>,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// JWT secret for admin authentication
    pub jwt_secret: String,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };

        let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(StripeClient::new(config.stripe_secret_key.clone()));
        let mailer: Arc<dyn Mailer> = Arc::new(SesMailer::new(ses, config.ses_from_email.clone()));

        Ok(Self::from_parts(pool, store, gateway, mailer, config))
    }

    /// Wire the services over already-built collaborators
    pub fn from_parts(
        pool: PgPool,
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
        config: &Config,
    ) -> Self {
        Self {
            checkout: CheckoutService::new(
                store.clone(),
                gateway.clone(),
                config.currency.clone(),
                config.storefront_url.clone(),
            ),
            reconciler: Reconciler::new(store.clone(), gateway.clone(), mailer.clone()),
            pool,
            store,
            gateway,
            mailer,
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}
