//! Command-line interface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::pdf::{check_tools, ExtractOptions, Language, PdfProcessor};
use crate::server;

#[derive(Parser)]
#[command(name = "pdf2text")]
#[command(about = "PDF text extraction service with OCR fallback")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP extraction API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value = "8000", env = "PORT")]
        port: u16,
    },

    /// Extract text from a local PDF file
    Extract {
        /// PDF file to process
        file: PathBuf,
        /// Disable OCR fallback for image-only pages
        #[arg(long)]
        no_ocr: bool,
        /// OCR language
        #[arg(short, long, default_value = "eng")]
        language: Language,
        /// Process the whole file as a single chunk
        #[arg(long)]
        no_chunking: bool,
        /// Keep repeated headers/footers
        #[arg(long)]
        keep_repetitive: bool,
        /// Keep copyright notices
        #[arg(long)]
        keep_copyright: bool,
        /// Write text to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check availability of the external extraction tools
    Check,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Arc::new(Settings::load(cli.config.as_deref())?);

    match cli.command {
        Commands::Serve { host, port } => server::serve(settings, &host, port).await,
        Commands::Extract {
            file,
            no_ocr,
            language,
            no_chunking,
            keep_repetitive,
            keep_copyright,
            output,
        } => {
            let options = ExtractOptions {
                use_ocr: !no_ocr,
                chunking: !no_chunking,
                language,
                remove_repetitive: !keep_repetitive,
                remove_copyright: !keep_copyright,
            };
            extract_command(settings, &file, options, output.as_deref()).await
        }
        Commands::Check => {
            check_command();
            Ok(())
        }
    }
}

async fn extract_command(
    settings: Arc<Settings>,
    file: &std::path::Path,
    options: ExtractOptions,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let processor = PdfProcessor::new(settings);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Extracting {}", file.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = processor.process_file(file, options).await?;
    spinner.finish_and_clear();

    eprintln!(
        "{} {} pages, {} chars, {} chunk(s)",
        style("✓").green(),
        result.pages,
        result.total_chars,
        result.chunks_processed
    );

    match output {
        Some(path) => std::fs::write(path, &result.text)?,
        None => println!("{}", result.text),
    }
    Ok(())
}

fn check_command() {
    for (tool, available) in check_tools() {
        if available {
            println!("{} {}", style("✓").green(), tool);
        } else {
            println!("{} {} (missing)", style("✗").red(), tool);
        }
    }
}
