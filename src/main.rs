//! Alimentar CLI - sparse-feature inference driver
//!
//! Loads an inference model from a directory, feeds it ragged slot data
//! parsed from a feature file, executes a fixed number of passes, and
//! prints the collected output tensors.

use std::path::PathBuf;

use clap::Parser;

use alimentar::{run_pipeline, RunConfig};

/// Alimentar - feed sparse feature data into an inference model
#[derive(Parser)]
#[command(name = "alimentar")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory of the inference model (program.bin + model.bin)
    #[arg(long, default_value = "model")]
    model_path: PathBuf,

    /// Path of the feature dataset
    #[arg(long, default_value = "data/sample.data")]
    data_path: PathBuf,

    /// Comma-separated internal variable names to fetch for debugging
    #[arg(long, default_value = "")]
    fetch_var: String,

    /// First line of the feature file to read (inclusive, 1-based)
    #[arg(long, default_value_t = 1)]
    start_line: usize,

    /// Last line of the feature file to read (inclusive)
    #[arg(long, default_value_t = 1_000_000)]
    end_line: usize,

    /// Number of inference iterations over the same bound inputs
    #[arg(long, default_value_t = 1)]
    iter: usize,

    /// Disable wall-clock profiling (the iterations still run)
    #[arg(long)]
    no_profile: bool,

    /// Print the run report as JSON instead of plain lines
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = RunConfig::new(cli.model_path, cli.data_path)
        .with_line_range(cli.start_line, cli.end_line)
        .with_iterations(cli.iter)
        .with_profile(!cli.no_profile)
        .with_fetch_var(cli.fetch_var)
        .with_verbose(!cli.json);

    let report = match run_pipeline(&config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        },
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize report: {e}");
                std::process::exit(1);
            },
        }
        return;
    }

    println!(
        "[predict] iter = {}, time = {} ms",
        report.iterations, report.elapsed_ms
    );

    for (name, values) in &report.outputs {
        let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("{name}: {}", joined.join(","));
    }

    for (name, values) in &report.internals {
        let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("fetched \"{name}\" of size {}: {}", values.len(), joined.join(","));
    }
}
