// TextLens entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config (a missing GOOGLE_API_KEY is fatal here)
// 3. Build the Gemini client
// 4. Bind the listener and serve until ctrl-c

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use textlens_core::config;
use textlens_llm::GeminiClient;
use textlens_web::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("TextLens starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: model={}, export to {}",
        config.llm.model,
        config.export.path().display()
    );

    // 3. Build the Gemini client
    let client = GeminiClient::from_config(&config);
    info!("Gemini client initialized for {}", client.endpoint());

    // 4. Serve
    let state = AppState::new(Arc::new(client), config.export.path());
    let app = server::router(state, config.server.max_upload_bytes);
    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    server::run(listener, app).await?;

    info!("TextLens shut down cleanly");
    Ok(())
}

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "textlens=info,textlens_web=info,textlens_app=info,textlens_llm=info,\
                 textlens_core=info,tower_http=info,warn",
            )
        }))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
