//! circlefit CLI: fit a circle to points from JSON files or the command line.

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

use circlefit::{Circle, CircleFitter, FitConfig, FitOutput};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "circlefit")]
#[command(about = "Least-squares circle fitting for small 2D point sets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a circle to a point set.
    Fit(CliFitArgs),

    /// Generate a synthetic noisy point set on a circle or arc.
    Synth(CliSynthArgs),

    /// Print the default fit configuration as JSON.
    ConfigDefaults,
}

#[derive(Debug, Clone, Args)]
struct CliFitArgs {
    /// JSON file holding an array of [x, y] pairs.
    #[arg(long)]
    points: Option<PathBuf>,

    /// Extra point as "x,y". May be repeated.
    #[arg(long = "point", value_parser = parse_point, allow_hyphen_values = true)]
    point: Vec<[f64; 2]>,

    /// JSON file with fit configuration overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write the fit result (JSON). Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliSynthArgs {
    /// Circle center x.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    cx: f64,

    /// Circle center y.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    cy: f64,

    /// Circle radius.
    #[arg(long)]
    radius: f64,

    /// Number of points.
    #[arg(long, default_value = "12")]
    n: usize,

    /// Uniform noise half-width added to each coordinate.
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// RNG seed for reproducible noise.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Arc start angle in radians.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    arc_start: f64,

    /// Arc span in radians (full circle by default).
    #[arg(long, default_value_t = std::f64::consts::TAU)]
    arc_span: f64,

    /// Path to write the points (JSON). Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_point(s: &str) -> Result<[f64; 2], String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{}\"", s))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|e| format!("invalid x in \"{}\": {}", s, e))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|e| format!("invalid y in \"{}\": {}", s, e))?;
    Ok([x, y])
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fit(args) => run_fit(&args),
        Commands::Synth(args) => run_synth(&args),
        Commands::ConfigDefaults => run_config_defaults(),
    }
}

fn run_fit(args: &CliFitArgs) -> CliResult<()> {
    let mut points = match &args.points {
        Some(path) => load_points(path)?,
        None => Vec::new(),
    };
    points.extend(args.point.iter().copied());

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => FitConfig::default(),
    };

    tracing::info!("Fitting circle to {} points", points.len());
    let fitter = CircleFitter::with_config(points, config)?;
    let fit = fitter.fit()?;

    tracing::info!(
        "center = ({:.6}, {:.6}), radius = {:.6}, rms residual = {:.3e}",
        fit.circle.center[0],
        fit.circle.center[1],
        fit.circle.radius,
        fit.rms_residual
    );

    let json = serde_json::to_string_pretty(&FitOutput::from(&fit))?;
    emit(&json, args.out.as_deref())
}

fn run_synth(args: &CliSynthArgs) -> CliResult<()> {
    if !args.radius.is_finite() || args.radius <= 0.0 {
        return Err(format!("radius must be positive, got {}", args.radius).into());
    }
    if !args.noise.is_finite() || args.noise < 0.0 {
        return Err(format!("noise must be non-negative, got {}", args.noise).into());
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let points: Vec<[f64; 2]> = Circle::new(args.cx, args.cy, args.radius)
        .sample_arc(args.n, args.arc_start, args.arc_span)
        .into_iter()
        .map(|[x, y]| {
            if args.noise > 0.0 {
                [
                    x + rng.gen_range(-args.noise..args.noise),
                    y + rng.gen_range(-args.noise..args.noise),
                ]
            } else {
                [x, y]
            }
        })
        .collect();

    tracing::info!("Generated {} points", points.len());
    let json = serde_json::to_string_pretty(&points)?;
    emit(&json, args.out.as_deref())
}

fn run_config_defaults() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&FitConfig::default())?);
    Ok(())
}

fn load_points(path: &Path) -> CliResult<Vec<[f64; 2]>> {
    tracing::info!("Loading points: {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|e| -> CliError {
        format!("Failed to read {}: {}", path.display(), e).into()
    })?;
    let points: Vec<[f64; 2]> = serde_json::from_str(&text).map_err(|e| -> CliError {
        format!("Failed to parse points in {}: {}", path.display(), e).into()
    })?;
    Ok(points)
}

fn load_config(path: &Path) -> CliResult<FitConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| -> CliError {
        format!("Failed to read {}: {}", path.display(), e).into()
    })?;
    let config: FitConfig = serde_json::from_str(&text).map_err(|e| -> CliError {
        format!("Failed to parse config in {}: {}", path.display(), e).into()
    })?;
    Ok(config)
}

fn emit(json: &str, out: Option<&Path>) -> CliResult<()> {
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_point_accepts_spaces_and_negatives() {
        assert_eq!(parse_point("1.5, -2"), Ok([1.5, -2.0]));
        assert_eq!(parse_point("-3,4e1"), Ok([-3.0, 40.0]));
    }

    #[test]
    fn parse_point_rejects_malformed() {
        assert!(parse_point("1.5").is_err());
        assert!(parse_point("a,2").is_err());
    }

    #[test]
    fn cli_parses_repeated_points() {
        let cli = Cli::try_parse_from([
            "circlefit", "fit", "--point", "10,0", "--point", "0,10", "--point", "-10,0",
        ])
        .expect("parse");
        let Commands::Fit(args) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert_eq!(args.point, vec![[10.0, 0.0], [0.0, 10.0], [-10.0, 0.0]]);
    }
}
