//! Output collection
//!
//! Copies named output tensors out of the engine into a plain mapping.
//! Fetch failures are isolated per name: each requested name gets its own
//! success-or-error outcome, and one failure never aborts collection of the
//! remaining names.

use std::collections::BTreeMap;

use crate::engine::Engine;
use crate::error::AlimentarError;

/// Result of fetching one named variable from the engine
#[derive(Debug)]
pub struct FetchOutcome {
    /// Requested output or internal variable name
    pub name: String,
    /// Fetched values, or the per-name fetch error
    pub result: Result<Vec<f32>, AlimentarError>,
}

/// Fetch every requested name, collecting one outcome per name
#[must_use]
pub fn collect_outputs(engine: &dyn Engine, names: &[String]) -> Vec<FetchOutcome> {
    names
        .iter()
        .map(|name| FetchOutcome {
            name: name.clone(),
            result: engine.fetch(name),
        })
        .collect()
}

/// Fold successful outcomes into an output mapping, logging failures
///
/// Failed fetches are reported to stderr and skipped; they never abort the
/// remaining names.
#[must_use]
pub fn into_output_map(outcomes: Vec<FetchOutcome>) -> BTreeMap<String, Vec<f32>> {
    let mut map = BTreeMap::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(values) => {
                map.insert(outcome.name, values);
            },
            Err(e) => {
                eprintln!("warning: {e}");
            },
        }
    }
    map
}

/// Fetch internal variables named in a comma-separated list
///
/// Empty segments are ignored, so `"a,,b,"` requests exactly `a` and `b`.
#[must_use]
pub fn fetch_internal(engine: &dyn Engine, var_list: &str) -> Vec<FetchOutcome> {
    let names: Vec<String> = var_list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();
    collect_outputs(engine, &names)
}
