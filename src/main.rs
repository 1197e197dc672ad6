use tracing::info;

use playroom_assistant::agent::{Generator, HttpGenerator, OllamaGenerator};
use playroom_assistant::clipboard::SystemClipboard;
use playroom_assistant::config::{AppConfig, Backend};
use playroom_assistant::host::FileHost;
use playroom_assistant::models::Catalog;
use playroom_assistant::repl::Repl;
use playroom_assistant::service::AssistantService;
use playroom_assistant::speech::SpeechCapabilities;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Logs go to stderr so they stay out of the transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playroom_assistant=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    // ── Host document ─────────────────────────────────────────────────────────
    let catalog = match &config.catalog {
        Some(path) => FileHost::load_catalog(path)?,
        None => Catalog::default(),
    };
    info!(
        "Using document {} with {} components",
        config.document.display(),
        catalog.components.len()
    );
    let host = FileHost::new(config.document.clone(), catalog);

    // ── Generation backend ────────────────────────────────────────────────────
    let generator: Box<dyn Generator> = match config.backend {
        Backend::Http => Box::new(HttpGenerator::new(&config.endpoint, &config.request_via)),
        Backend::Ollama => Box::new(OllamaGenerator::new(
            &config.ollama_base_url,
            &config.ollama_model,
        )?),
    };

    let service = AssistantService::new(generator, host);
    info!("Generating via {}", service.generator_name());
    let mut repl = Repl::new(service, SystemClipboard, SpeechCapabilities::detect());
    repl.run().await
}
