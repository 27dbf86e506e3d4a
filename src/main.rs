//! Picture Novelty CLI - Run a novelty search from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use picture_novelty::{
    NoveltyRun,
    compute::novelty::NoveltyArchive,
    schema::RunConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Run a picture novelty search from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!("  generations  Number of generations (default: from config, else unbounded)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(generations) = args.get(2).and_then(|s| s.parse::<usize>().ok()) {
        config.generations = Some(generations);
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    println!("Picture Novelty Search");
    println!("======================");
    println!(
        "Evaluation: {}x{} {} (snapshots x{})",
        config.novelty.width, config.novelty.height, config.novelty.scheme, config.novelty.full_scale
    );
    println!("Population: {}", config.population.size);
    println!("Workers: {}", config.novelty.workers);
    println!("Admission probability: {}", config.novelty.admission_probability);
    match config.generations {
        Some(n) => println!("Generations: {}", n),
        None => println!("Generations: unbounded"),
    }
    println!("Output: {:?}", config.novelty.output_dir);
    println!();

    let archive_path = config.novelty.output_dir.join("archive.json");

    let checkpoint_interval = config.checkpoint_interval;
    let mut run = NoveltyRun::new(config)
        .unwrap_or_else(|e| {
            eprintln!("Error creating run: {}", e);
            std::process::exit(1);
        })
        .with_checkpoint(&archive_path);

    // Resume from an archive left by a previous run
    if archive_path.exists() {
        let archive = NoveltyArchive::load_json(&archive_path).unwrap_or_else(|e| {
            eprintln!("Error loading archive {:?}: {}", archive_path, e);
            std::process::exit(1);
        });
        println!("Resuming with {} archive entries", archive.len());
        run = run.with_archive(archive).unwrap_or_else(|e| {
            eprintln!("Error resuming archive: {}", e);
            std::process::exit(1);
        });
    }

    if checkpoint_interval > 0 {
        println!(
            "Checkpointing archive to {:?} every {} generation(s)",
            archive_path, checkpoint_interval
        );
    }

    let start = Instant::now();
    let result = run.run_with_callback(|progress| {
        let elapsed = start.elapsed().as_secs_f32();
        println!(
            "  Generation {}: best={:.4}, avg={:.4}, admitted={}, archive={}, {:.1}s",
            progress.generation,
            progress.best_fitness,
            progress.avg_fitness,
            progress.admitted,
            progress.archive_size,
            elapsed
        );
    });

    // The run has already checkpointed the archive on both paths.
    let result = result.unwrap_or_else(|e| {
        eprintln!("Run aborted: {}", e);
        std::process::exit(1);
    });

    println!();
    println!("Stopped: {:?}", result.stop_reason);
    println!("Generations: {}", result.generations);
    println!("Archive entries: {} (saved to {:?})", result.archive_size, archive_path);
    if let Some(best) = &result.best {
        println!(
            "Most novel genome: id {} (generation {}), fitness {:.4}",
            best.id, best.generation, best.fitness
        );
    }
    println!(
        "Time: {:.2}s ({:.2} generations/s)",
        result.elapsed_seconds,
        result.generations as f64 / result.elapsed_seconds.max(1e-9)
    );
}

fn print_example_config() {
    let config = RunConfig {
        generations: Some(100),
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example config: {}", e),
    }
}
