//! lumen - color profile aware image converter
//!
//! Converts images between ICC profiles with luminance scaling, tonemapping,
//! automatic grading, resizing and HALD CLUTs.

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use lumen_ops::Context;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "LUMEN_LOG";

#[derive(Parser)]
#[command(name = "lumen")]
#[command(author, version, about = "Color profile aware image converter")]
#[command(long_about = "
Converts images between color profiles, scaling luminance and tonemapping
when the destination has less headroom than the source.

Examples:
  lumen identify image.png                     # Show image and profile info
  lumen identify image.png --json -z 0,0,2,2   # JSON, with a few pixels
  lumen convert in.png out.png -p bt2020 -l 300
  lumen convert hdr.png sdr.jpg -l 100 -t on
  lumen convert in.png out.png -a -b 8         # Auto-grade for 8-bit
  lumen convert in.png out.icc -g 2.4          # Write only the profile
  lumen generate hald:8 identity.png
  lumen generate 256x256,#ff8000 orange.png -p p3
  lumen calc '#ff0000' -p bt2020
  lumen modify in.png out.png -d 'My profile' -c 'Me'
  lumen report in.png report.json
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of worker tasks (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    jobs: usize,

    /// Allow the analytic conversion path for plain gamma profiles
    #[arg(long, global = true)]
    ccmm: bool,

    /// Also write the log to this file
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one color and print the result as JSON
    Calc(CalcArgs),

    /// Convert an image to another profile, depth or format
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Create an image (solid color or identity HALD)
    #[command(visible_alias = "g")]
    Generate(GenerateArgs),

    /// Show image and profile information
    #[command(visible_alias = "i")]
    Identify(IdentifyArgs),

    /// Rewrite profile metadata without converting pixels
    Modify(ModifyArgs),

    /// Write a JSON report about an image
    Report(ReportArgs),
}

/// Destination profile flags shared by convert, generate and calc.
#[derive(Args)]
struct ProfileArgs {
    /// Pick destination luminance and gamma automatically
    #[arg(short = 'a', long = "auto-grade")]
    auto_grade: bool,

    /// Output bits per channel (0 = source)
    #[arg(short = 'b', long = "bpc", default_value = "0")]
    depth: u32,

    /// Copyright for a new destination profile
    #[arg(short = 'c', long)]
    copyright: Option<String>,

    /// Description for a new destination profile
    #[arg(short = 'd', long)]
    description: Option<String>,

    /// Destination gamma (0 = source)
    #[arg(short = 'g', long, default_value = "0")]
    gamma: f32,

    /// Destination luminance in nits (0 = source)
    #[arg(short = 'l', long, default_value = "0")]
    luminance: u32,

    /// Destination primaries: bt709, bt2020, p3 or rx,ry,gx,gy,bx,by,wx,wy
    #[arg(short = 'p', long)]
    primaries: Option<String>,

    /// Tonemap: auto, on, off
    #[arg(short = 't', long, default_value = "auto")]
    tonemap: String,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input image
    input: PathBuf,

    /// Output image (or .icc for the profile only)
    output: PathBuf,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Output format (default: from the output extension)
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Use this profile instead of the one embedded in the input
    #[arg(short = 'i', long = "icc-in")]
    icc_in: Option<PathBuf>,

    /// Embed this profile in the output instead of the destination one
    #[arg(short = 'o', long = "icc-out")]
    icc_out: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(short = 'q', long, default_value = "90")]
    quality: u8,

    /// JPEG 2000 rate
    #[arg(short = '2', long, default_value = "150")]
    rate: u32,

    /// Resize: w,h[,filter] (0 keeps aspect)
    #[arg(short = 'r', long)]
    resize: Option<String>,

    /// Crop: x,y,w,h
    #[arg(short = 'z', long)]
    rect: Option<String>,

    /// HALD CLUT image to apply before converting
    #[arg(long)]
    hald: Option<PathBuf>,
}

#[derive(Args)]
struct GenerateArgs {
    /// hald:N or WxH[,COLOR]
    image: String,

    /// Output image
    output: PathBuf,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Output format (default: from the output extension)
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Embed this profile in the output instead of the generated one
    #[arg(short = 'o', long = "icc-out")]
    icc_out: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(short = 'q', long, default_value = "90")]
    quality: u8,
}

#[derive(Args)]
struct CalcArgs {
    /// Color: #rrggbb, #rrggbbaa or (r,g,b[,a])
    color: String,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Source profile (default: sRGB)
    #[arg(short = 'i', long = "icc-in")]
    icc_in: Option<PathBuf>,
}

#[derive(Args)]
struct IdentifyArgs {
    /// Input image or .icc file
    input: PathBuf,

    /// Print JSON instead of logging
    #[arg(long)]
    json: bool,

    /// Also list the profile's tags
    #[arg(long)]
    tags: bool,

    /// Dump pixel values in x,y,w,h
    #[arg(short = 'z', long)]
    rect: Option<String>,

    /// Use this profile instead of the embedded one
    #[arg(short = 'i', long = "icc-in")]
    icc_in: Option<PathBuf>,
}

#[derive(Args)]
struct ModifyArgs {
    /// Input image or .icc file
    input: PathBuf,

    /// Output file
    output: PathBuf,

    /// New description
    #[arg(short = 'd', long)]
    description: Option<String>,

    /// New copyright
    #[arg(short = 'c', long)]
    copyright: Option<String>,

    /// New luminance in nits
    #[arg(short = 'l', long)]
    luminance: Option<u32>,
}

#[derive(Args)]
struct ReportArgs {
    /// Input image
    input: PathBuf,

    /// Output JSON file
    output: PathBuf,

    /// Use this profile instead of the embedded one
    #[arg(short = 'i', long = "icc-in")]
    icc_in: Option<PathBuf>,
}

/// Installs the stderr subscriber, plus a file sink when `log` is set.
///
/// The returned guard flushes the file sink on drop.
fn init_logging(verbose: bool, log: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(path) = log else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file = path
        .file_name()
        .with_context(|| format!("Invalid log file: {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log.as_deref())?;

    // Configure thread pool
    if cli.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.jobs)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let ctx = Context::new()
        .with_jobs(cli.jobs)
        .with_ccmm(cli.ccmm)
        .with_verbose(cli.verbose);

    match cli.command {
        Commands::Calc(args) => commands::calc::run(args, &ctx),
        Commands::Convert(args) => commands::convert::run(args, &ctx),
        Commands::Generate(args) => commands::generate::run(args, &ctx),
        Commands::Identify(args) => commands::identify::run(args, &ctx),
        Commands::Modify(args) => commands::modify::run(args, &ctx),
        Commands::Report(args) => commands::report::run(args, &ctx),
    }
}
