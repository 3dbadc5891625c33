use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Ask questions about a folder of text documents.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about, propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding the persistent vector index.
    #[arg(long, env = "DOCQA_STORE", default_value = "chroma_persistent_storage", global = true)]
    pub store: PathBuf,

    /// Name of the collection inside the store.
    #[arg(long, env = "DOCQA_COLLECTION", default_value = "document_qa_collection", global = true)]
    pub collection: String,

    /// Use local hash embeddings and an extractive model instead of OpenAI.
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chunk, embed, and index every `.txt` file in a directory.
    Ingest(IngestArgs),
    /// Answer a question from the indexed documents.
    Ask(AskArgs),
    /// Show how many chunks are indexed.
    Stats,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Directory of `.txt` documents.
    #[arg(long, default_value = "./news_articles")]
    pub dir: PathBuf,

    /// Maximum chunk size in characters.
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(long, default_value_t = 20)]
    pub chunk_overlap: usize,

    /// Embedding requests in flight at once.
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Attempts per embedding request, including the first.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// The question to answer.
    pub question: String,

    /// Number of chunks to retrieve as context.
    #[arg(short = 'n', long, default_value_t = 2)]
    pub n_results: usize,

    /// Print the retrieved chunks before the answer.
    #[arg(long)]
    pub show_context: bool,
}
