//! # Alimentar
//!
//! Sparse-feature inference driver: parse a line-oriented feature file into
//! named ragged slots, bind each slot into the matching engine input tensor,
//! execute a fixed number of inference passes, and collect named output
//! tensors into a plain mapping.
//!
//! Alimentar (Spanish: "to feed") is glue between tabular sparse data and an
//! inference engine consumed through the [`Engine`] trait. The pipeline is
//! single-threaded and synchronous; the engine handle owns every tensor
//! buffer and is held by the top-level run for the whole execution.
//!
//! ## Example
//!
//! ```no_run
//! use alimentar::{run_pipeline, RunConfig};
//!
//! let config = RunConfig::new("model", "data/sample.data")
//!     .with_line_range(1, 100)
//!     .with_iterations(10);
//! let report = run_pipeline(&config).unwrap();
//! for (name, values) in &report.outputs {
//!     println!("{name}: {values:?}");
//! }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────┐    ┌─────────┐    ┌──────────┐    ┌────────────┐
//! │ Reader │ -> │ Binder  │ -> │  Engine  │ -> │ Collector  │
//! │ data.rs│    │binder.rs│    │ engine.rs│    │ collect.rs │
//! └────────┘    └─────────┘    └──────────┘    └────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::float_cmp)] // Exact zero is part of the profiling contract
#![allow(clippy::cast_precision_loss)]

pub mod binder;
pub mod collect;
pub mod data;
pub mod engine;
pub mod error;
pub mod run;
pub mod slot;

// Re-exports for convenience
pub use binder::bind_slots;
pub use collect::{collect_outputs, fetch_internal, into_output_map, FetchOutcome};
pub use data::Dataset;
pub use engine::{Engine, EngineConfig, ProgramManifest, RaggedTensor, SumPoolEngine};
pub use error::{AlimentarError, BindingError, Result};
pub use run::{execute, run_pipeline, RunConfig, RunReport};
pub use slot::Slot;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }
}
