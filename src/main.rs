use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;

use signal_ledger::channels::{LogNotifier, Notifier, TelegramNotifier};
use signal_ledger::config::AppConfig;
use signal_ledger::pipeline::SignalProcessor;
use signal_ledger::server;
use signal_ledger::store::{LibSqlStore, RestStore, SignalStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    eprintln!("📈 Signal Ledger v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Webhook: http://0.0.0.0:{}/telegram/webhook",
        config.port
    );

    // ── Store ───────────────────────────────────────────────────────────
    let store: Arc<dyn SignalStore> = match &config.rest_store {
        Some(rest) => {
            eprintln!("   Store: REST {}/rest/v1/{}", rest.base_url, rest.table);
            Arc::new(RestStore::new(rest))
        }
        None => {
            eprintln!("   Store: libSQL {}", config.db_path);
            Arc::new(
                LibSqlStore::new_local(Path::new(&config.db_path))
                    .await
                    .with_context(|| format!("failed to open database at {}", config.db_path))?,
            )
        }
    };

    // ── Notifier ────────────────────────────────────────────────────────
    let notifier: Arc<dyn Notifier> = match &config.telegram_token {
        Some(token) if !token.expose_secret().is_empty() => {
            let telegram = TelegramNotifier::new(token.clone());
            if let Err(e) = telegram.health_check().await {
                tracing::warn!("Telegram token check failed: {e}");
            }
            Arc::new(telegram)
        }
        _ => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set; replies will only be logged");
            Arc::new(LogNotifier)
        }
    };
    eprintln!("   Notifier: {}", notifier.name());

    tracing::info!(
        instruments = ?config.parser.instruments.symbols(),
        default_symbol = ?config.parser.instruments.default_symbol(),
        completeness = ?config.parser.completeness,
        mark_eligibility = ?config.lifecycle.mark_eligibility,
        cancel_mode = ?config.lifecycle.cancel_mode,
        "Signal policies"
    );

    let processor = Arc::new(
        SignalProcessor::new(store, notifier, &config.parser, config.lifecycle.clone())
            .with_start_aliases(&config.start_aliases),
    );

    let app = server::routes(processor);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Signal Ledger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
