//! PixelQ - LED array brightness measurement from photographs
//!
//! Loads a photograph of an LED array, derives per-LED pixel positions
//! from user-supplied grid corners (or heuristic auto-alignment), samples
//! brightness around each position, and exports the results as CSV and/or
//! a JSON session document.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pixelq::session::{MeasurementMethod, Session};
use pixelq::{config, export};

/// PixelQ - LED array brightness measurement
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image of the LED array
    #[arg(short, long)]
    image: PathBuf,

    /// Grid corners in display coordinates:
    /// "tlx,tly,trx,try,brx,bry,blx,bly"
    #[arg(long)]
    corners: Option<String>,

    /// Detect LED candidates automatically instead of using corners
    #[arg(long)]
    auto_align: bool,

    /// Array size override (n for an n×n grid)
    #[arg(short = 'n', long)]
    array_size: Option<u32>,

    /// Sampling region half-width override, in pixels
    #[arg(long)]
    radius: Option<u32>,

    /// Measurement method
    #[arg(long, value_enum, default_value_t = MethodArg::Direct)]
    method: MethodArg,

    /// Skip the dark-region enhancement pre-pass
    #[arg(long)]
    no_enhance: bool,

    /// Write measurement rows to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the full session document to this JSON file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    /// Direct region sampling only
    Direct,
    /// Direct sampling completed by neighbor interpolation
    Interpolation,
}

impl From<MethodArg> for MeasurementMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Direct => MeasurementMethod::Direct,
            MethodArg::Interpolation => MeasurementMethod::Interpolation,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("PixelQ v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::Config::load_or_create(&args.config)?;
    if let Some(n) = args.array_size {
        config.grid.array_size = n;
    }
    if let Some(radius) = args.radius {
        config.grid.sampling_radius = radius;
    }
    if args.no_enhance {
        config.measure.enhance_dark_leds = false;
    }

    let mut session = Session::new(&config)?;

    let image = image::open(&args.image)
        .with_context(|| format!("Failed to load image from {:?}", args.image))?
        .to_rgb8();
    session.load_image(image);

    if let Some(spec) = &args.corners {
        let corners = parse_corners(spec)?;
        session.begin_corner_definition()?;
        for (x, y) in corners {
            session.handle_click(x, y);
        }
        info!(
            "grid corners set, {} positions derived",
            session.positions().len()
        );
    } else if args.auto_align {
        let outcome = session.auto_align()?;
        if !outcome.is_complete() {
            warn!(
                "partial grid: {} of {} LED candidates found",
                outcome.candidates_found, outcome.expected
            );
        }
    } else {
        bail!("no LED positions: provide --corners or --auto-align");
    }

    let method: MeasurementMethod = args.method.into();
    let report = session.measure(method)?;
    let records = export::build_records(&report.measurements, method.as_str());

    if let Some(path) = &args.csv {
        std::fs::write(path, export::to_csv(&records))
            .with_context(|| format!("Failed to write CSV to {:?}", path))?;
        info!("results exported to {:?}", path);
    }

    if let Some(path) = &args.json {
        let doc = export::SessionDocument::new(
            session.array_size(),
            session.corners(),
            session.positions(),
            records,
        );
        let json = serde_json::to_string_pretty(&doc).context("Failed to serialize session")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write session to {:?}", path))?;
        info!("session saved to {:?}", path);
    }

    Ok(())
}

/// Parse "tlx,tly,trx,try,brx,bry,blx,bly" into four corner points
fn parse_corners(spec: &str) -> Result<[(f64, f64); 4]> {
    let values: Vec<f64> = spec
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid corner coordinate {:?}", v))
        })
        .collect::<Result<_>>()?;

    if values.len() != 8 {
        bail!("expected 8 corner coordinates, got {}", values.len());
    }

    Ok([
        (values[0], values[1]),
        (values[2], values[3]),
        (values[4], values[5]),
        (values[6], values[7]),
    ])
}
