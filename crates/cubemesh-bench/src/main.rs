use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use cubemesh_bench::report;
use cubemesh_bench::runner::BenchmarkRunner;
use cubemesh_bench::scenes;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut frame_count = 120u32;
    let mut use_gpu = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--baseline" => {
                i += 1;
                baseline_path = Some(PathBuf::from(value(&args, i, "--baseline")));
            }
            "--output" => {
                i += 1;
                output_path = Some(PathBuf::from(value(&args, i, "--output")));
            }
            "--regression-threshold" => {
                i += 1;
                regression_threshold = parse_value(&args, i, "--regression-threshold");
            }
            "--frames" => {
                i += 1;
                frame_count = parse_value(&args, i, "--frames");
            }
            "--gpu" => use_gpu = true,
            "--help" | "-h" => {
                eprintln!("Usage: bench-runner [OPTIONS]");
                eprintln!("  --baseline <path>              Load baseline JSON for comparison");
                eprintln!("  --output <path>                Save current results as JSON baseline");
                eprintln!(
                    "  --regression-threshold <pct>   Regression threshold percentage (default: 10)"
                );
                eprintln!("  --frames <n>                   Frames per scene (default: 120)");
                eprintln!("  --gpu                          Also time the GPU path");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match scenes::load_pipeline_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            process::exit(1);
        }
    };

    if use_gpu {
        log::info!("Initializing GPU...");
    }
    let runner = BenchmarkRunner::new(config, frame_count, use_gpu);

    let mut results = Vec::new();
    for scene in &scenes::standard_scenes() {
        match runner.run_scene(scene) {
            Ok(result) => results.push(result),
            Err(e) => {
                eprintln!("ERROR: scene '{}' failed: {e}", scene.name);
                process::exit(1);
            }
        }
    }

    // Print markdown summary
    println!("\n## Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: timestamp(),
            results: results.clone(),
        };
        match report::save_baseline(path, &baseline) {
            Ok(()) => log::info!("Saved baseline to {}", path.display()),
            Err(e) => log::error!("Failed to save baseline to {}: {e}", path.display()),
        }
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(1);
        }
    }
}

fn parse_value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    let raw = value(args, i, flag);
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Invalid {flag} value: {raw}");
            process::exit(1);
        }
    }
}

/// Seconds since the Unix epoch, without a date-time dependency.
fn timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("bench-{secs}")
}
