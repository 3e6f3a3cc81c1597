//! subscription-reconciler binary: loads configuration, wires adapters, serves HTTP.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use secrecy::ExposeSecret;
use subscription_reconciler::adapters::http::{reconciler_router, ReconcilerAppState};
use subscription_reconciler::adapters::postgres::PostgresSubscriptionStateStore;
use subscription_reconciler::adapters::redis::{RedisActivityPublisher, RedisEntitlementCache};
use subscription_reconciler::adapters::stripe::{StripeBillingClient, StripeConfig};
use subscription_reconciler::application::HandleStripeWebhookHandler;
use subscription_reconciler::config::AppConfig;
use subscription_reconciler::domain::webhook::StripeWebhookVerifier;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        // Subscriber may not be installed yet
        eprintln!("subscription-reconciler exited with error: {:#}", error);
        tracing::error!("subscription-reconciler exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    init_tracing(&config)?;
    tracing::info!(
        environment = ?config.server.environment,
        live_key = config.payment.is_live_mode(),
        livemode_required = config.payment.require_livemode,
        "Configuration loaded"
    );

    // State store
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("connecting to PostgreSQL")?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("applying migrations")?;
        tracing::info!("Migrations applied");
    }
    let state_store = Arc::new(PostgresSubscriptionStateStore::new(pool));

    // Cache and activity channel
    let redis_client =
        redis::Client::open(config.redis.url.as_str()).context("parsing Redis URL")?;
    let redis_conn = tokio::time::timeout(
        config.redis.timeout(),
        redis_client.get_multiplexed_tokio_connection(),
    )
    .await
    .context("connecting to Redis timed out")?
    .context("connecting to Redis")?;
    let entitlement_cache = Arc::new(RedisEntitlementCache::new(redis_conn.clone()));
    let activity_writer = Arc::new(RedisActivityPublisher::new(
        redis_conn,
        config.activity.channel.clone(),
    ));

    // Billing provider
    let billing = Arc::new(
        StripeBillingClient::new(
            StripeConfig::new(config.payment.stripe_api_key.expose_secret().clone())
                .with_base_url(config.payment.stripe_api_base_url.clone()),
        )
        .context("building Stripe client")?,
    );

    let verifier = StripeWebhookVerifier::new(config.payment.stripe_webhook_secret.expose_secret().clone())
        .with_tolerance_secs(config.payment.webhook_tolerance_secs)
        .require_livemode(config.payment.require_livemode);

    let webhook_handler = HandleStripeWebhookHandler::new(
        verifier,
        state_store.clone(),
        billing,
        entitlement_cache.clone(),
        activity_writer,
    )
    .with_service_name(config.activity.service_name.clone());

    let app = reconciler_router(ReconcilerAppState {
        webhook_handler: Arc::new(webhook_handler),
        state_store,
        entitlement_cache,
    })
    .layer(TimeoutLayer::new(config.server.request_timeout()))
    .layer(TraceLayer::new_for_http())
    .layer(PropagateRequestIdLayer::x_request_id())
    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!(%addr, "subscription-reconciler listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.server.log_level)
        .context("parsing log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.is_production() {
        builder.json().with_current_span(false).try_init()
    } else {
        builder.compact().try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("installing tracing subscriber: {}", e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
