use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "docflow",
    version,
    about = "Submit PDF documents to the document-processing backend and collect the results"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Backend base URL, e.g. http://host/document_api
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// RON config file (defaults to ./docflow.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write the log to ./docflow.log
    #[arg(long, global = true)]
    pub log_file: bool,

    /// No log output on the terminal
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the bundled sample documents
    Samples,
    /// Extract administrative fields from a PDF
    Extract {
        #[command(flatten)]
        input: InputArgs,

        /// Confidence threshold in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,

        /// Disable the text corrector
        #[arg(long)]
        no_corrector: bool,
    },
    /// Convert a scanned PDF to DOCX
    Convert {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Add a searchable text layer to a PDF
    Textlayer {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// PDF file to upload
    #[arg(long, conflicts_with = "sample")]
    pub file: Option<PathBuf>,

    /// Name of a bundled sample (see `docflow samples`)
    #[arg(long)]
    pub sample: Option<String>,

    /// Directory for saved results
    #[arg(long)]
    pub out: Option<PathBuf>,
}
