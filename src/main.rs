use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quickmoov::{
    default_output_path, is_bmff, is_supported_extension, Analysis, LayoutStatus, MoovError,
    Mp4File, RelocateOptions,
};

#[derive(Parser)]
#[command(name = "quickmoov")]
#[command(version, about = "Fast-start optimizer for MP4/MOV files", long_about = None)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List top-level boxes
    Atoms {
        /// Input container
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Analyze layout: fast-start, padding, metadata size
    Analyze {
        /// Input container
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,
    },

    /// Exit with status 1 if the file would benefit from conversion
    Check {
        /// Input container
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Write a fast-start copy
    Convert {
        /// Input container
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output path (default: <name>_modified.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep free/skip padding boxes
        #[arg(long)]
        keep_padding: bool,

        /// Leave moov where it is (only strip padding)
        #[arg(long)]
        no_fast_start: bool,

        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, env.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Atoms { input } => {
            let file = open_container(&input)?;
            println!("{:<6} {:>14} {:>14}", "TYPE", "OFFSET", "SIZE");
            for b in file.boxes() {
                println!("{:<6} {:>14} {:>14}", b.box_type.to_string(), b.offset, b.size);
            }
        }

        Commands::Analyze { input, format } => {
            let file = open_container(&input)?;
            let analysis = file
                .analyze()
                .with_context(|| format!("cannot analyze {}", input.display()))?;
            match format {
                OutputFormat::Human => print_analysis_human(&input, &analysis),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&analysis)?);
                }
            }
        }

        Commands::Check { input } => {
            let file = open_container(&input)?;
            let analysis = file
                .analyze()
                .with_context(|| format!("cannot analyze {}", input.display()))?;
            println!("{}: {}", input.display(), status_label(analysis.status()));
            if analysis.status() != LayoutStatus::Optimized {
                return Ok(ExitCode::from(1));
            }
        }

        Commands::Convert {
            input,
            output,
            keep_padding,
            no_fast_start,
            force,
        } => {
            let output = output.unwrap_or_else(|| default_output_path(&input));
            if output.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                );
            }

            let mut options = RelocateOptions::default();
            if keep_padding {
                options = options.keep_padding();
            }
            if no_fast_start {
                options = options.keep_metadata_in_place();
            }

            let file = open_container(&input)?;
            match file.relocate_to(&output, &options) {
                Ok(summary) => {
                    info!(
                        output = %output.display(),
                        delta = summary.delta,
                        removed_padding = summary.removed_padding,
                        "converted"
                    );
                    println!("Saved {}", output.display());
                    if summary.moved_metadata {
                        println!(
                            "  moov moved to front ({} chunk offsets shifted by {})",
                            summary.patch.entries, summary.delta
                        );
                    }
                    if summary.removed_padding > 0 {
                        println!("  removed {} bytes of padding", summary.removed_padding);
                    }
                }
                Err(MoovError::NothingToOptimize) => {
                    println!("{}: already optimized, nothing to do", input.display());
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("cannot convert {} to {}", input.display(), output.display())
                    });
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// `RUST_LOG` when set, otherwise info (debug with `-v`)
fn log_filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(env.unwrap_or_default())
}

fn open_container(path: &Path) -> anyhow::Result<Mp4File> {
    if !is_supported_extension(path) {
        warn!(path = %path.display(), "unexpected file extension, trying anyway");
    }

    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
    );
    if !is_bmff(&mut reader).with_context(|| format!("cannot read {}", path.display()))? {
        bail!("{} is not an MP4/QuickTime container", path.display());
    }
    drop(reader);

    Mp4File::open(path).with_context(|| format!("cannot scan {}", path.display()))
}

fn status_label(status: LayoutStatus) -> &'static str {
    match status {
        LayoutStatus::NeedsFastStart => "needs conversion (moov after mdat)",
        LayoutStatus::HasPadding => "fast-start, but has removable padding",
        LayoutStatus::Optimized => "already optimized",
    }
}

fn print_analysis_human(path: &Path, analysis: &Analysis) {
    println!("File:        {}", path.display());
    println!("Size:        {} bytes", analysis.file_size);
    println!("Fast-start:  {}", if analysis.is_fast_start { "yes" } else { "no" });
    println!(
        "moov:        {} bytes ({:.2}% of file)",
        analysis.moov_size,
        analysis.metadata_ratio() * 100.0
    );
    println!("mdat:        {} bytes", analysis.mdat_size);
    if analysis.has_free_atom {
        println!(
            "Padding:     {} bytes ({:.1}% of file)",
            analysis.free_atom_size,
            analysis.padding_ratio() * 100.0
        );
    } else {
        println!("Padding:     none");
    }
    let tags: Vec<String> = analysis.atom_tags.iter().map(|t| t.to_string()).collect();
    println!("Atoms:       {}", tags.join(" "));
    println!("Status:      {}", status_label(analysis.status()));
}
