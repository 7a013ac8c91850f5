use storefront::BoxError;
use storefront::api;
use storefront::config::Config;
use storefront::state::AppState;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting storefront (env: {})", config.environment);

    let state = AppState::new(&config).await?;
    let app = api::router(state, &config.cors_origin);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("storefront HTTP listening on {http_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
