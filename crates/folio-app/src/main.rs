// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — PDF transformation, compression, and staging engine
//
// Entry point. Initialises logging and the PDF service, stages the local input
// files, runs one operation, and copies the results to the requested
// destination.

mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use folio_core::types::{SplitStrategy, format_bytes};
use folio_core::{FolioError, report_error};
use folio_staging::CleanupGuard;

use services::data_dir;
use services::pdf_service::{PdfService, Placement};

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Split, merge, compress, rotate and stamp PDF files",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge PDFs into one, in the order given
    Merge {
        /// Input PDF files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a PDF into several files
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Directory receiving the parts
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value = "individual")]
        mode: SplitMode,

        /// Page expression for `selected` mode (e.g. "1-3, 5")
        #[arg(short, long)]
        pages: Option<String>,

        /// Number of parts for `equal` mode
        #[arg(long)]
        parts: Option<u32>,

        /// Pages per file for `chunk` mode
        #[arg(long)]
        chunk_size: Option<u32>,

        /// Deliver one zip archive instead of separate files
        #[arg(long)]
        zip: bool,
    },

    /// Reduce the size of a PDF
    Compress {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// low, medium or high; the configured default when omitted
        #[arg(short, long)]
        level: Option<String>,
    },

    /// Rotate pages
    Rotate {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Rotation in degrees, a multiple of 90
        #[arg(short, long, default_value = "90", allow_hyphen_values = true)]
        angle: i32,

        /// Pages to rotate (e.g. "1,3,5-7"); all pages when omitted
        #[arg(short, long)]
        pages: Option<String>,
    },

    /// Stamp translucent diagonal text on every page
    Watermark {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Watermark text (default "CONFIDENTIAL")
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Add a signature line
    Sign {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Signature text (default "Signed")
        #[arg(short, long)]
        text: Option<String>,

        #[command(flatten)]
        placement: PlacementArgs,
    },

    /// Write a line of text onto a page
    Edit {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Text to add
        #[arg(short, long)]
        text: String,

        #[command(flatten)]
        placement: PlacementArgs,
    },

    /// Remove stale files from the staging area now
    Sweep,
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitMode {
    Individual,
    Selected,
    Equal,
    Chunk,
}

#[derive(clap::Args)]
struct PlacementArgs {
    /// 0-based page index
    #[arg(long)]
    page: Option<usize>,

    /// Horizontal position in points
    #[arg(short, long, requires = "y")]
    x: Option<f32>,

    /// Vertical position in points
    #[arg(short, long, requires = "x")]
    y: Option<f32>,
}

impl From<PlacementArgs> for Placement {
    fn from(args: PlacementArgs) -> Self {
        Placement {
            page: args.page,
            at: args.x.zip(args.y),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = data_dir::data_dir();
    let config = data_dir::load_config(&dir);

    let service = match PdfService::init(config.clone(), &dir) {
        Ok(service) => service,
        Err(err) => {
            print_report(&report_error(&err, config.production));
            return ExitCode::FAILURE;
        }
    };

    let code = match run(&service, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<FolioError>() {
                Some(folio) => print_report(&service.render_error(folio)),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    };

    service.shutdown().await;
    code
}

async fn run(service: &PdfService, command: Commands) -> Result<()> {
    match command {
        Commands::Merge { files, output } => {
            let mut uploads = CleanupGuard::new("merge uploads");
            let mut staged = Vec::with_capacity(files.len());
            for file in &files {
                let path = stage(service, file).await?;
                uploads.track(&path);
                staged.push(path);
            }
            // The service releases the uploads from here on.
            uploads.disarm();
            let merged = service.merge(staged).await?;
            deliver(service, Delivery::Single, &[(merged, output)]).await?;
        }

        Commands::Split {
            input,
            output,
            mode,
            pages,
            parts,
            chunk_size,
            zip,
        } => {
            let strategy = match mode {
                SplitMode::Individual => SplitStrategy::Individual,
                SplitMode::Selected => SplitStrategy::Selected {
                    pages: pages.unwrap_or_default(),
                },
                SplitMode::Equal => SplitStrategy::Equal {
                    parts: parts.unwrap_or(0),
                },
                SplitMode::Chunk => SplitStrategy::Chunk {
                    chunk_size: chunk_size.unwrap_or(0),
                },
            };
            let staged = stage(service, &input).await?;
            let entries = service.split(staged, strategy).await?;

            let mut parts = CleanupGuard::new("split outputs");
            for entry in &entries {
                parts.track(&entry.path);
            }
            tokio::fs::create_dir_all(&output)
                .await
                .with_context(|| format!("creating {}", output.display()))?;
            parts.disarm();

            if zip {
                let archive = service.bundle(entries).await?;
                let name = format!("{}-split.zip", file_stem(&input));
                deliver(service, Delivery::Split, &[(archive, output.join(name))]).await?;
            } else {
                let pairs: Vec<(PathBuf, PathBuf)> = entries
                    .into_iter()
                    .map(|entry| {
                        let destination = output.join(&entry.display_name);
                        (entry.path, destination)
                    })
                    .collect();
                deliver(service, Delivery::Split, &pairs).await?;
            }
        }

        Commands::Compress {
            input,
            output,
            level,
        } => {
            let staged = stage(service, &input).await?;
            let report = service.compress(staged, level.as_deref()).await?;
            deliver(service, Delivery::Single, &[(report.output_path.clone(), output)]).await?;
            println!(
                "{} -> {} ({:.1}% smaller, {})",
                format_bytes(report.original_size),
                format_bytes(report.compressed_size),
                report.reduction_percent,
                report.optimizer.as_deref().unwrap_or("structural re-save"),
            );
        }

        Commands::Rotate {
            input,
            output,
            angle,
            pages,
        } => {
            let staged = stage(service, &input).await?;
            let rotated = service.rotate(staged, angle, pages).await?;
            deliver(service, Delivery::Single, &[(rotated, output)]).await?;
        }

        Commands::Watermark {
            input,
            output,
            text,
        } => {
            let staged = stage(service, &input).await?;
            let stamped = service.watermark(staged, text).await?;
            deliver(service, Delivery::Single, &[(stamped, output)]).await?;
        }

        Commands::Sign {
            input,
            output,
            text,
            placement,
        } => {
            let staged = stage(service, &input).await?;
            let signed = service.sign(staged, text, placement.into()).await?;
            deliver(service, Delivery::Single, &[(signed, output)]).await?;
        }

        Commands::Edit {
            input,
            output,
            text,
            placement,
        } => {
            let staged = stage(service, &input).await?;
            let edited = service.edit(staged, &text, placement.into()).await?;
            deliver(service, Delivery::Single, &[(edited, output)]).await?;
        }

        Commands::Sweep => {
            let report = service.sweep_now().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Copy a local file into the staging area.
async fn stage(service: &PdfService, path: &Path) -> Result<PathBuf> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string());
    Ok(service.stage_upload(bytes, &name).await?.path)
}

/// Which grace delay applies to delivered artifacts.
#[derive(Clone, Copy)]
enum Delivery {
    Single,
    Split,
}

/// Copy each `(artifact, destination)` pair in order, then hand every
/// artifact to the grace-delay release whether or not the copies succeeded.
async fn deliver(
    service: &PdfService,
    delivery: Delivery,
    pairs: &[(PathBuf, PathBuf)],
) -> Result<()> {
    let mut outcome = Ok(());
    for (artifact, destination) in pairs {
        if let Err(err) = tokio::fs::copy(artifact, destination).await {
            outcome = Err(anyhow::Error::new(err)
                .context(format!("writing {}", destination.display())));
            break;
        }
        println!("{}", destination.display());
    }

    let artifacts: Vec<PathBuf> = pairs.iter().map(|(artifact, _)| artifact.clone()).collect();
    match delivery {
        Delivery::Single => service.complete_delivery(&artifacts),
        Delivery::Split => service.complete_split_delivery(&artifacts),
    }
    outcome
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

fn print_report(report: &folio_core::ErrorReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{json}"),
        Err(_) => eprintln!("error: {}", report.message),
    }
}
