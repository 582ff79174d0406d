//! StudyStage application binary - composition root.
//!
//! 1. Load `.env`, CLI flags and the TOML configuration
//! 2. Build the embedding, chat and document services (Upstage or offline)
//! 3. Create the shared similarity index and study assistant
//! 4. Serve the axum REST API

mod cli;

use std::sync::Arc;

use clap::Parser;

use studystage_api::routes;
use studystage_api::state::AppState;
use studystage_chat::{
    AssistantSettings, ChatService, DocumentDigitizer, MockChat, PlainTextDigitizer,
    StudyAssistant, UpstageChat, UpstageDocumentParser,
};
use studystage_core::config::StudyConfig;
use studystage_vector::{
    ChunkEmbedder, DynEmbeddingService, MockEmbedding, SimilarityIndex, UpstageEmbedding,
};

use crate::cli::CliArgs;

/// Embedding, answer chat, keyword chat and document parser.
type Services = (
    Arc<dyn DynEmbeddingService>,
    Arc<dyn ChatService>,
    Arc<dyn ChatService>,
    Arc<dyn DocumentDigitizer>,
);

fn upstage_services(config: &StudyConfig) -> Result<Services, Box<dyn std::error::Error>> {
    let embedding: Arc<dyn DynEmbeddingService> =
        Arc::new(UpstageEmbedding::from_config(&config.upstage)?);
    let chat: Arc<dyn ChatService> = Arc::new(UpstageChat::from_config(&config.upstage)?);
    let keyword_chat: Arc<dyn ChatService> = Arc::new(
        UpstageChat::from_config(&config.upstage)?
            .with_model(config.upstage.keyword_model.clone()),
    );
    let parser: Arc<dyn DocumentDigitizer> =
        Arc::new(UpstageDocumentParser::from_config(&config.upstage)?);
    Ok((embedding, chat, keyword_chat, parser))
}

fn offline_services() -> Services {
    let embedding: Arc<dyn DynEmbeddingService> = Arc::new(MockEmbedding::new());
    let chat: Arc<dyn ChatService> = Arc::new(MockChat::new());
    let digitizer: Arc<dyn DocumentDigitizer> = Arc::new(PlainTextDigitizer);
    (embedding, Arc::clone(&chat), chat, digitizer)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = StudyConfig::load_or_default(&config_file);
    config.general.port = args.resolve_port(config.general.port);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing. RUST_LOG wins over the resolved level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting StudyStage v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");
    config.validate()?;

    let (embedding, chat, keyword_chat, digitizer) = if args.offline {
        tracing::warn!("Offline mode: answers and embeddings are local stand-ins");
        offline_services()
    } else {
        upstage_services(&config)?
    };

    let embedder = ChunkEmbedder::from_config(embedding, &config.retrieval)?;
    let index = Arc::new(SimilarityIndex::new(embedder));
    tracing::info!(
        max_chunk_chars = config.retrieval.max_chunk_chars,
        embed_concurrency = config.retrieval.embed_concurrency,
        "Similarity index initialized"
    );

    let assistant = StudyAssistant::new(index, chat)
        .with_keyword_chat(keyword_chat)
        .with_settings(AssistantSettings::from(&config.retrieval));

    let state = AppState::new(config.clone(), assistant, digitizer);
    routes::start_server(&config, state).await?;

    Ok(())
}
