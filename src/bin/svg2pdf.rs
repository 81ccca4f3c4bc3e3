//! CLI binary for edgequake-svg2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, drives a `Session` and saves the result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_svg2pdf::{
    inspect_source, parse_color, CompressionLevel, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, ProgressCallback, Session, SourceFile, Stage, Svg2PdfError,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that prints one line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, source_name: &str) {
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {source_name}…"))
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.2}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_conversion_complete(&self, pdf_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} PDF ready  {}", green("✔"), dim(&format!("{pdf_bytes} bytes")));
    }

    fn on_conversion_error(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert into the current directory as converted-svg.pdf
  svg2pdf logo.svg

  # Convert to an explicit path
  svg2pdf logo.svg -o logo.pdf

  # Write the PDF to stdout
  svg2pdf --stdout logo.svg > logo.pdf

  # Flatten transparency onto white
  svg2pdf --background white logo.svg

  # Size and title only, as JSON
  svg2pdf --inspect-only --json logo.svg

SIZING:
  The page is exactly as large as the SVG, 1 pt per pixel:
    width and height         →  used as-is (rounded)
    viewBox                  →  viewBox size (a lone width/height keeps its aspect)
    neither                  →  --default-width × --default-height (300 × 150),
                                per axis: width="200" alone gives 200 × 150

ENVIRONMENT VARIABLES:
  SVG2PDF_OUTPUT           Output path
  SVG2PDF_OUT_DIR          Output directory
  SVG2PDF_DECODE_TIMEOUT   Seconds to wait for the SVG to decode
  SVG2PDF_BACKGROUND       Background colour (#rgb, #rrggbb, #rrggbbaa, white, black)
  RUST_LOG                 Override tracing filter
"#;

/// Convert an SVG image into a one-page PDF.
#[derive(Parser, Debug)]
#[command(
    name = "svg2pdf",
    version,
    about = "Convert an SVG image into a one-page PDF",
    long_about = "Rasterise an SVG at its intrinsic size and place it on a single PDF page of \
exactly the same dimensions. The document is saved as converted-svg.pdf unless told otherwise.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// SVG file to convert.
    input: PathBuf,

    /// Declared MIME type of the input (derived from the extension if unset).
    #[arg(long, env = "SVG2PDF_MIME")]
    mime: Option<String>,

    /// Write the PDF to this path.
    #[arg(short, long, env = "SVG2PDF_OUTPUT", conflicts_with_all = ["out_dir", "stdout"])]
    output: Option<PathBuf>,

    /// Save converted-svg.pdf into this directory (default: current directory).
    #[arg(long, env = "SVG2PDF_OUT_DIR", conflicts_with = "stdout")]
    out_dir: Option<PathBuf>,

    /// Write the PDF bytes to stdout.
    #[arg(long)]
    stdout: bool,

    /// Seconds to wait for the SVG to decode before giving up.
    #[arg(long, env = "SVG2PDF_DECODE_TIMEOUT", default_value_t = 30)]
    decode_timeout: u64,

    /// Width used when the SVG declares no size.
    #[arg(long, env = "SVG2PDF_DEFAULT_WIDTH", default_value_t = 300)]
    default_width: u32,

    /// Height used when the SVG declares no size.
    #[arg(long, env = "SVG2PDF_DEFAULT_HEIGHT", default_value_t = 150)]
    default_height: u32,

    /// Largest accepted width or height in pixels.
    #[arg(long, env = "SVG2PDF_MAX_DIMENSION", default_value_t = 16384)]
    max_dimension: u32,

    /// Paint this colour behind the drawing (default: transparent).
    #[arg(long, env = "SVG2PDF_BACKGROUND")]
    background: Option<String>,

    /// Flate compression: fast, default, best.
    #[arg(long, env = "SVG2PDF_COMPRESSION", value_enum, default_value = "default")]
    compression: CompressionArg,

    /// Do not load system fonts (SVG text may not render).
    #[arg(long, env = "SVG2PDF_NO_SYSTEM_FONTS")]
    no_system_fonts: bool,

    /// Print SVG size information only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print results as JSON.
    #[arg(long, env = "SVG2PDF_JSON")]
    json: bool,

    /// Disable progress spinner.
    #[arg(long, env = "SVG2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SVG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SVG2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum CompressionArg {
    Fast,
    Default,
    Best,
}

impl From<CompressionArg> for CompressionLevel {
    fn from(v: CompressionArg) -> Self {
        match v {
            CompressionArg::Fast => CompressionLevel::Fast,
            CompressionArg::Default => CompressionLevel::Default,
            CompressionArg::Best => CompressionLevel::Best,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; stdout may carry PDF bytes, so logs go
    // to stderr.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Intake ───────────────────────────────────────────────────────────
    let mut source = SourceFile::open(&cli.input)
        .await
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;
    if let Some(ref mime) = cli.mime {
        source = source.with_mime(mime.clone());
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect_source(&source, &config).context("Failed to inspect SVG")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            println!("Size:         {} x {} px", meta.width, meta.height);
            println!("Size from:    {:?}", meta.size_source);
            if let Some([x, y, w, h]) = meta.view_box {
                println!("viewBox:      {} {} {} {}", x, y, w, h);
            }
            println!("Source bytes: {}", meta.source_bytes);
        }
        return Ok(());
    }

    let mut session = Session::new(config);
    if let Err(e) = session.select_file([source]) {
        if matches!(e, Svg2PdfError::InvalidFileType { .. }) {
            eprintln!("{} {}", red("✘"), bold(&e.to_string()));
            std::process::exit(2);
        }
        return Err(e.into());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = session.convert().await.context("Conversion failed")?;

    if cli.stdout {
        output
            .write_to(io::stdout().lock())
            .context("Failed to write to stdout")?;
    } else {
        let path = save(&cli, &output).await?;
        report(&cli, &output, &path)?;
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .decode_timeout_secs(cli.decode_timeout)
        .default_size(cli.default_width, cli.default_height)
        .max_dimension(cli.max_dimension)
        .compression(cli.compression.clone().into())
        .load_system_fonts(!cli.no_system_fonts);

    if let Some(ref colour) = cli.background {
        let rgba = parse_color(colour)
            .with_context(|| format!("Invalid background colour '{}'", colour))?;
        builder = builder.background(rgba);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn save(cli: &Cli, output: &ConversionOutput) -> Result<PathBuf> {
    let saved = match (&cli.output, &cli.out_dir) {
        (Some(path), _) => output.save_as(path).await,
        (None, Some(dir)) => output.save_to_dir(dir).await,
        (None, None) => output.save_to_dir(".").await,
    };
    saved.context("Failed to save PDF")
}

fn report(cli: &Cli, output: &ConversionOutput, path: &std::path::Path) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} x {} pt  {}ms  →  {}",
            green("✔"),
            stats.width,
            stats.height,
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        if stats.has_transparency {
            eprintln!("   {}", dim("transparent areas kept via soft mask"));
        }
        io::stderr().flush().ok();
    }
    Ok(())
}
