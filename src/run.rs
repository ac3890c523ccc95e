//! Top-level inference run
//!
//! Drives the fixed stage sequence: load model, read data, bind slots,
//! execute N iterations, collect outputs, optionally fetch internal
//! variables. Any stage failure aborts the run; there is no retry. The
//! engine handle is owned here and outlives binding, every execution call,
//! and collection.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::binder::bind_slots;
use crate::collect::{collect_outputs, fetch_internal, into_output_map, FetchOutcome};
use crate::data::Dataset;
use crate::engine::{Engine, EngineConfig, SumPoolEngine};
use crate::error::{AlimentarError, Result};

/// Configuration for one inference run
///
/// # Examples
///
/// ```
/// use alimentar::RunConfig;
///
/// let config = RunConfig::new("model", "data/sample.data")
///     .with_line_range(1, 100)
///     .with_iterations(10)
///     .with_profile(false);
/// assert_eq!(config.iterations, 10);
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the serialized program and parameters
    pub model_path: PathBuf,
    /// Path of the feature file
    pub data_path: PathBuf,
    /// Comma-separated internal variable names to fetch, empty for none
    pub fetch_var: String,
    /// First feature line to read (inclusive, 1-based)
    pub start_line: usize,
    /// Last feature line to read (inclusive)
    pub end_line: usize,
    /// Number of execution iterations over the same bound inputs
    pub iterations: usize,
    /// Whether to measure wall-clock time across the iterations
    pub profile: bool,
    /// Print stage progress to stdout
    pub verbose: bool,
}

impl RunConfig {
    /// Create a run configuration with the default line range and one iteration
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            data_path: data_path.into(),
            fetch_var: String::new(),
            start_line: 1,
            end_line: 1_000_000,
            iterations: 1,
            profile: true,
            verbose: false,
        }
    }

    /// Set the inclusive feature line range
    #[must_use]
    pub fn with_line_range(mut self, start_line: usize, end_line: usize) -> Self {
        self.start_line = start_line;
        self.end_line = end_line;
        self
    }

    /// Set the number of execution iterations
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Enable or disable profiling
    #[must_use]
    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// Set the comma-separated internal variable list
    #[must_use]
    pub fn with_fetch_var(mut self, fetch_var: impl Into<String>) -> Self {
        self.fetch_var = fetch_var.into();
        self
    }

    /// Enable stage progress output
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Results of a completed run
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Output tensor name to fetched values
    pub outputs: BTreeMap<String, Vec<f32>>,
    /// Successfully fetched internal variables
    pub internals: BTreeMap<String, Vec<f32>>,
    /// Elapsed wall-clock milliseconds for all iterations, 0.0 unprofiled
    pub elapsed_ms: f64,
    /// Number of executed iterations
    pub iterations: usize,
}

/// Execute `iterations` forward passes over the already-bound inputs
///
/// With `profile` the elapsed wall-clock time for the whole loop is
/// returned in milliseconds; without it the same iterations run but the
/// reported time is exactly 0.0.
///
/// # Errors
///
/// Propagates the first engine execution failure.
pub fn execute(engine: &mut dyn Engine, iterations: usize, profile: bool) -> Result<f64> {
    if profile {
        let start = Instant::now();
        for _ in 0..iterations {
            engine.run()?;
        }
        Ok(start.elapsed().as_secs_f64() * 1000.0)
    } else {
        for _ in 0..iterations {
            engine.run()?;
        }
        Ok(0.0)
    }
}

/// Run the full pipeline and report collected outputs
///
/// Stage order: load model, read data, bind, execute, collect, optional
/// internal fetch. Internal variable requests disable graph optimization so
/// the variables stay addressable, matching the engine contract.
///
/// # Errors
///
/// Returns the first fatal stage error: engine load/execution failure,
/// feature parse error, or binding mismatch. Per-name fetch failures are
/// logged and skipped, never fatal.
pub fn run_pipeline(config: &RunConfig) -> Result<RunReport> {
    if config.iterations == 0 {
        return Err(AlimentarError::Config {
            reason: "iteration count must be at least 1".to_string(),
        });
    }

    let stage = |msg: &str| {
        if config.verbose {
            println!("{msg}");
        }
    };

    let engine_config =
        EngineConfig::new(&config.model_path).with_ir_optim(config.fetch_var.is_empty());
    let mut engine = SumPoolEngine::load(&engine_config)?;
    stage("finish loading model");

    let dataset = Dataset::new(&config.data_path, config.start_line, config.end_line)?;
    let slots = dataset.read_slots()?;
    stage("finish reading data");

    bind_slots(&mut engine, &slots)?;
    stage("finish feeding data");

    let elapsed_ms = execute(&mut engine, config.iterations, config.profile)?;
    stage("finish execution");

    let outputs = into_output_map(collect_outputs(&engine, &engine.output_names()));

    let internals = if config.fetch_var.is_empty() {
        BTreeMap::new()
    } else {
        let outcomes: Vec<FetchOutcome> = fetch_internal(&engine, &config.fetch_var);
        into_output_map(outcomes)
    };

    Ok(RunReport {
        outputs,
        internals,
        elapsed_ms,
        iterations: config.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind_slots;
    use crate::engine::{ProgramManifest, SumPoolEngine};
    use crate::slot::Slot;

    fn bound_engine() -> SumPoolEngine {
        let manifest = ProgramManifest {
            inputs: vec!["x".to_string()],
            outputs: vec!["out".to_string()],
            internals: vec![],
        };
        let mut engine = SumPoolEngine::from_parts(manifest, vec![1.0, 0.0], true);
        let slots = vec![Slot::new("x", vec![1.0], vec![0, 1]).unwrap()];
        bind_slots(&mut engine, &slots).unwrap();
        engine
    }

    #[test]
    fn test_execute_profiled_elapsed_non_negative() {
        let mut engine = bound_engine();
        let elapsed = execute(&mut engine, 5, true).unwrap();
        assert!(elapsed >= 0.0);
        assert_eq!(engine.runs(), 5);
    }

    #[test]
    fn test_execute_unprofiled_reports_zero_but_runs() {
        let mut engine = bound_engine();
        let elapsed = execute(&mut engine, 4, false).unwrap();
        assert_eq!(elapsed, 0.0);
        assert_eq!(engine.runs(), 4);
    }

    #[test]
    fn test_execute_propagates_engine_failure() {
        let manifest = ProgramManifest {
            inputs: vec!["x".to_string()],
            outputs: vec!["out".to_string()],
            internals: vec![],
        };
        // Never bound: first iteration must fail.
        let mut engine = SumPoolEngine::from_parts(manifest, vec![1.0, 0.0], true);
        assert!(execute(&mut engine, 2, true).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = RunConfig::new("m", "d")
            .with_line_range(3, 7)
            .with_iterations(9)
            .with_profile(false)
            .with_fetch_var("a,b")
            .with_verbose(true);
        assert_eq!(config.start_line, 3);
        assert_eq!(config.end_line, 7);
        assert_eq!(config.iterations, 9);
        assert!(!config.profile);
        assert_eq!(config.fetch_var, "a,b");
        assert!(config.verbose);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = RunConfig::new("m", "d").with_iterations(0);
        assert!(matches!(
            run_pipeline(&config).unwrap_err(),
            AlimentarError::Config { .. }
        ));
    }
}
