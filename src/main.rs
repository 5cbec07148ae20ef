use std::sync::Arc;

use job_socket::config::SocketConfig;
use job_socket::http::socket_routes;
use job_socket::i18n::{Catalog, Passthrough, Translator};
use job_socket::socket::SocketStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = SocketConfig::from_env()?;

    eprintln!("Job Socket v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data: {}", config.data_root.display());
    eprintln!(
        "   API: http://{}/{}/get/{{id}}",
        config.bind,
        config.route_prefix
    );
    eprintln!(
        "   Auth: {}",
        if config.auth_token.is_some() {
            "bearer token"
        } else {
            "none"
        }
    );

    // ── Localization ────────────────────────────────────────────────────
    let translator: Arc<dyn Translator> = match &config.lang_dir {
        Some(dir) => match Catalog::load(dir, &config.locale) {
            Ok(catalog) => {
                eprintln!("   Locale: {} ({} messages)", config.locale, catalog.len());
                Arc::new(catalog)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to untranslated messages");
                Arc::new(Passthrough)
            }
        },
        None => Arc::new(Passthrough),
    };

    // ── Data root ───────────────────────────────────────────────────────
    std::fs::create_dir_all(&config.data_root)?;

    let bind = config.bind;
    let store = SocketStore::with_translator(config, translator);
    let app = socket_routes(store);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "Socket server started");
    axum::serve(listener, app).await?;

    Ok(())
}
