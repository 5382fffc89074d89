use circlefit::{CircleFitter, FitOutput};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <points.json> [out.json]", args[0]);
        std::process::exit(2);
    }

    let text = std::fs::read_to_string(&args[1])?;
    let points: Vec<[f64; 2]> = serde_json::from_str(&text)?;

    let fit = CircleFitter::new(points)?.fit()?;
    println!(
        "Center ({:.4}, {:.4}), radius {:.4}, {} iterations.",
        fit.circle.center[0], fit.circle.center[1], fit.circle.radius, fit.iterations
    );

    if let Some(out_path) = args.get(2) {
        let json = serde_json::to_string_pretty(&FitOutput::from(&fit))?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
