use std::sync::Arc;

use anyhow::{Context, Result};
use docqa_rag::{
    AnswerSynthesizer, DirectorySource, DocumentSource, EmbeddingClient, FileVectorIndex,
    HashEmbeddingClient, IngestionEvent, IngestionPipeline, LanguageModel, MockLanguageModel,
    OpenAIChatModel, OpenAIEmbeddingClient, RagConfig, RetrievalService, RetryPolicy, VectorIndex,
};
use tracing::{debug, info, warn};

use crate::cli::{AskArgs, Cli, IngestArgs};

const RETRY_INITIAL_BACKOFF: std::time::Duration = std::time::Duration::from_millis(500);

fn embedding_client(cli: &Cli) -> Result<Arc<dyn EmbeddingClient>> {
    if cli.offline {
        return Ok(Arc::new(HashEmbeddingClient::default()));
    }
    let mut client = OpenAIEmbeddingClient::from_env().context("configuring OpenAI embeddings")?;
    if let Ok(model) = std::env::var("OPENAI_EMBEDDING_MODEL") {
        client = client.with_model(model);
    }
    Ok(Arc::new(client))
}

fn language_model(cli: &Cli) -> Result<Arc<dyn LanguageModel>> {
    if cli.offline {
        return Ok(Arc::new(MockLanguageModel::extractive()));
    }
    let mut model = OpenAIChatModel::from_env().context("configuring OpenAI chat model")?;
    if let Ok(name) = std::env::var("OPENAI_CHAT_MODEL") {
        model = model.with_model(name);
    }
    Ok(Arc::new(model))
}

async fn open_index(cli: &Cli) -> Result<Arc<FileVectorIndex>> {
    let index =
        FileVectorIndex::open(&cli.store, cli.collection.as_str()).await.with_context(|| {
            format!("opening collection '{}' in {}", cli.collection, cli.store.display())
        })?;
    Ok(Arc::new(index))
}

fn log_event(event: &IngestionEvent) {
    match event {
        IngestionEvent::DocumentsLoaded { count } => info!(count, "loaded documents"),
        IngestionEvent::DocumentChunked { document_id, chunks } => {
            debug!(document.id = %document_id, chunks, "split document into chunks")
        }
        IngestionEvent::ChunkEmbedded { chunk_id } => {
            debug!(chunk.id = %chunk_id, "embedded chunk")
        }
        IngestionEvent::EmbeddingRetry { chunk_id, attempt, delay } => {
            warn!(chunk.id = %chunk_id, attempt, ?delay, "retrying embedding")
        }
        IngestionEvent::DocumentIndexed { document_id, chunks } => {
            info!(document.id = %document_id, chunks, "indexed document")
        }
        IngestionEvent::Completed(report) => info!(
            documents = report.documents_loaded,
            chunks = report.chunks_indexed,
            "ingestion finished"
        ),
    }
}

pub async fn ingest(cli: &Cli, args: &IngestArgs) -> Result<()> {
    let config = RagConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.chunk_overlap)
        .embed_concurrency(args.concurrency)
        .retry(RetryPolicy::exponential(args.retries, RETRY_INITIAL_BACKOFF))
        .build()
        .context("invalid ingestion settings")?;

    let documents = DirectorySource::new(&args.dir)
        .load()
        .with_context(|| format!("loading documents from {}", args.dir.display()))?;
    if documents.is_empty() {
        warn!(dir = %args.dir.display(), "no .txt documents found");
    }

    let pipeline = IngestionPipeline::builder()
        .config(config)
        .embedding_client(embedding_client(cli)?)
        .index(open_index(cli).await?)
        .observer(Arc::new(log_event))
        .build()?;

    let report = pipeline.ingest(&documents).await.context("ingestion failed")?;
    println!(
        "Indexed {} chunks from {} documents into '{}'",
        report.chunks_indexed, report.documents_loaded, cli.collection
    );
    Ok(())
}

pub async fn ask(cli: &Cli, args: &AskArgs) -> Result<()> {
    let retrieval =
        RetrievalService::new(embedding_client(cli)?, open_index(cli).await?, args.n_results)
            .context("invalid retrieval settings")?;
    let synthesizer = AnswerSynthesizer::new(language_model(cli)?);

    let context = retrieval.retrieve(&args.question).await.context("retrieval failed")?;
    if args.show_context {
        for (rank, chunk) in context.iter().enumerate() {
            println!("[{}] {chunk}\n", rank + 1);
        }
    }

    let answer = synthesizer
        .synthesize(&args.question, &context.chunks)
        .await
        .context("answer generation failed")?;
    println!("{}", answer.text);
    Ok(())
}

pub async fn stats(cli: &Cli) -> Result<()> {
    let index = open_index(cli).await?;
    let count = index.count().await?;
    println!("{count} chunks in '{}' ({})", cli.collection, index.path().display());
    Ok(())
}
