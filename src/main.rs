//! Turing patterns CLI - Run a simulation from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use turing_patterns::{
    compute::{FieldStats, RunDecision, Simulation},
    schema::{Seed, SimulationConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [contours.json]", args[0]);
        eprintln!();
        eprintln!("Run a reaction-diffusion simulation from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json    Path to simulation configuration file");
        eprintln!("  contours.json  Write isolines of the final field at `bias` here");
        eprintln!();
        eprintln!("An optional seed is read from <config>.seed.json.");
        eprintln!("Example configuration is printed with the --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let contour_path = args.get(2).map(PathBuf::from);

    let config = SimulationConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    // Load or create seed
    let seed_path = config_path.with_extension("seed.json");
    let seed: Seed = if seed_path.exists() {
        let seed_str = fs::read_to_string(&seed_path).unwrap_or_else(|e| {
            eprintln!("Error reading seed file: {}", e);
            std::process::exit(1);
        });
        serde_json::from_str(&seed_str).unwrap_or_else(|e| {
            eprintln!("Error parsing seed: {}", e);
            std::process::exit(1);
        })
    } else {
        Seed::default()
    };

    let params = config.params;

    println!("Turing Pattern Simulation");
    println!("=========================");
    println!("Grid: {}x{}", config.width, config.height);
    println!(
        "Da={} Db={} alpha={} beta={}",
        params.da, params.db, params.alpha, params.beta
    );
    println!(
        "dt: {} (stability limit {:.6}), dx: {}",
        params.dt,
        params.stability_limit(),
        params.dx
    );
    println!(
        "Max steps: {} ({} per frame)",
        params.max_steps, params.steps_per_frame
    );
    println!();

    let mut sim = Simulation::from_config(&config, &seed).unwrap_or_else(|e| {
        eprintln!("Error initializing simulation: {}", e);
        std::process::exit(1);
    });

    println!("Initial state:");
    print_stats(&sim.stats());
    println!();

    println!("Running simulation...");
    let start = Instant::now();
    let report_every = (params.max_steps / 10).max(1);
    let mut next_report = report_every;

    let result = sim.run_with_callback(&params, |report| {
        if report.current_step >= next_report {
            next_report += report_every;
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Step {}/{}: change={:.3e}, {:.1} steps/s",
                report.current_step,
                params.max_steps,
                report.metric,
                report.current_step as f32 / elapsed
            );
        }
    });

    let elapsed = start.elapsed();
    let steps = sim.state().current_step;

    println!();
    match result {
        Ok(RunDecision::Converged) => println!("Pattern stabilized after {} steps", steps),
        Ok(RunDecision::StepLimitReached) => println!("Step budget exhausted ({} steps)", steps),
        Ok(RunDecision::Continue) => println!("Paused at step {}", steps),
        Err(e) => {
            eprintln!("Simulation stopped at step {}: {}", steps, e);
            std::process::exit(1);
        }
    }

    println!();
    println!("Final state:");
    print_stats(&sim.stats());
    println!(
        "Time: {:.2}s ({:.1} steps/s)",
        elapsed.as_secs_f32(),
        steps as f32 / elapsed.as_secs_f32()
    );

    if let Some(path) = contour_path {
        let contour = sim.contours(params.bias).unwrap_or_else(|e| {
            eprintln!("Error extracting contours: {}", e);
            std::process::exit(1);
        });
        let json = serde_json::to_string(&contour).unwrap_or_else(|e| {
            eprintln!("Error serializing contours: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = fs::write(&path, json) {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!(
            "Wrote {} contours at bias {} to {}",
            contour.len(),
            params.bias,
            path.display()
        );
    }
}

fn print_stats(stats: &FieldStats) {
    println!(
        "  A range: [{:.6}, {:.6}], mean {:.6}",
        stats.a.min_value, stats.a.max_value, stats.a.mean_value
    );
    println!(
        "  B range: [{:.6}, {:.6}], mean {:.6}",
        stats.b.min_value, stats.b.max_value, stats.b.mean_value
    );
    if stats.non_finite > 0 {
        println!("  Non-finite cells: {}", stats.non_finite);
    }
}

fn print_example_config() {
    let config = SimulationConfig::default();
    let seed = Seed::default();

    match (
        serde_json::to_string_pretty(&config),
        serde_json::to_string_pretty(&seed),
    ) {
        (Ok(config), Ok(seed)) => {
            println!("Example configuration (config.json):");
            println!("{}", config);
            println!();
            println!("Example seed (config.seed.json):");
            println!("{}", seed);
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
