//! bluepdf - merge, split, encrypt, decrypt and render PDF files.
//!
//! Every command writes its output into the directory given by `--out-dir`
//! and prints the resulting path(s).

use anyhow::{Context, bail};
use bluepdf_core::api;
use bluepdf_core::document::KeyLength;
use bluepdf_core::engine::{self, CancellationToken, EngineConfig};
use bluepdf_core::raster::CompressionLevel;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output quality preset.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Level {
    /// 72 dpi, JPEG quality 60, at most 800x1200
    Low,
    /// 150 dpi, JPEG quality 80, at most 1200x1800
    Medium,
    /// 300 dpi, JPEG quality 95, at most 2480x3508
    High,
}

impl From<Level> for CompressionLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => Self::Low,
            Level::Medium => Self::Medium,
            Level::High => Self::High,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "bluepdf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory receiving output files
    #[arg(short = 'o', long = "out-dir", default_value = ".", global = true)]
    out_dir: PathBuf,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue, global = true)]
    debug: bool,

    /// Worker threads for rendering and image work (default: all cores)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine images into a PDF, one page per image
    ImagesToPdf {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(short, long, value_enum)]
        level: Level,
    },
    /// Concatenate PDFs in the given order
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Extract pages START..=END (1-indexed)
    Split {
        file: PathBuf,
        start: usize,
        end: usize,
    },
    /// Protect a PDF with a password
    Encrypt {
        file: PathBuf,
        #[arg(short, long)]
        password: String,
        /// AES key length in bits, 128 or 256
        #[arg(short, long, default_value_t = 256)]
        key_length: u32,
    },
    /// Remove the password from a PDF
    Decrypt {
        file: PathBuf,
        #[arg(short, long)]
        password: String,
    },
    /// Render every page to a JPEG
    ToImages {
        file: PathBuf,
        #[arg(short, long, value_enum)]
        level: Level,
    },
    /// Write the pages in a new order, e.g. `3,1,2`
    Reorder {
        file: PathBuf,
        #[arg(required = true, value_delimiter = ',')]
        order: Vec<usize>,
    },
    /// Rotate every page clockwise
    Rotate {
        file: PathBuf,
        /// Multiple of 90
        #[arg(allow_hyphen_values = true)]
        degrees: i64,
    },
    /// Print document facts as JSON
    Info {
        file: PathBuf,
        #[arg(short, long)]
        password: Option<String>,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);
    engine::init(&EngineConfig {
        worker_threads: args.threads,
    })
    .context("starting worker pool")?;
    debug!(out_dir = %args.out_dir.display(), "bluepdf starting");

    let out = args.out_dir.as_path();
    let path = match args.command {
        Command::ImagesToPdf { images, level } => api::image_to_pdf(&images, level.into(), out)?,
        Command::Merge { files } => api::merge_pdf(&files, out)?,
        Command::Split { file, start, end } => api::split_pdf(&file, start, end, out)?,
        Command::Encrypt {
            file,
            password,
            key_length,
        } => api::encrypt_pdf(&file, &password, KeyLength::try_from(key_length)?, out)?,
        Command::Decrypt { file, password } => api::decrypt_pdf(&file, &password, out)?,
        Command::Reorder { file, order } => api::reorder_pdf(&file, &order, out)?,
        Command::Rotate { file, degrees } => api::rotate_pdf(&file, degrees, out)?,
        Command::ToImages { file, level } => {
            let images = api::pdf_to_images(&file, level.into(), out, &CancellationToken::new())?;
            for path in &images.paths {
                println!("{}", path.display());
            }
            for issue in &images.issues {
                eprintln!(
                    "page {}: could not draw `{}`: {}",
                    issue.page, issue.operator, issue.message
                );
            }
            for failure in &images.failures {
                eprintln!("page {} failed: {}", failure.page, failure.message);
            }
            if images.paths.is_empty() && !images.failures.is_empty() {
                bail!("no page could be rendered");
            }
            return Ok(());
        }
        Command::Info { file, password } => {
            let info = api::pdf_info(&file, password.as_deref())
                .with_context(|| format!("reading {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            return Ok(());
        }
    };
    println!("{}", path.display());
    Ok(())
}
