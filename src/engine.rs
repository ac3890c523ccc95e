//! Inference engine seam
//!
//! The driver talks to the engine through the [`Engine`] trait: named ragged
//! input buffers the binder writes into, an execution call, and named output
//! fetches. Buffer lifetime stays with the engine handle; callers request
//! access by name instead of holding pointers into engine memory.
//!
//! [`SumPoolEngine`] is the reference implementation. It consumes the model
//! artifact layout the driver expects — a directory holding `program.bin`
//! (JSON graph manifest) and `model.bin` (raw little-endian f32 parameters)
//! — and runs a sum-pool / linear / sigmoid forward pass over the bound
//! ragged inputs.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::{AlimentarError, Result};
use crate::slot::validate_offsets;

/// Engine-owned ragged input buffer
///
/// Flat values plus a CSR-style offset array, the zero-copy layout the
/// engine executes against. The binder assigns into it in place; tests read
/// examples back through [`RaggedTensor::example`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaggedTensor {
    values: Vec<f32>,
    offsets: Vec<usize>,
}

impl RaggedTensor {
    /// Create an empty, unbound buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            offsets: Vec::new(),
        }
    }

    /// Replace the buffer contents with a new ragged layout
    ///
    /// # Errors
    ///
    /// Returns an error when the offsets violate the ragged-layout
    /// invariant for the given values.
    pub fn assign(&mut self, values: Vec<f32>, offsets: Vec<usize>) -> Result<()> {
        validate_offsets("input buffer", values.len(), &offsets)?;
        self.values = values;
        self.offsets = offsets;
        Ok(())
    }

    /// Whether the buffer has been assigned a layout
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !self.offsets.is_empty()
    }

    /// Flat value array
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Boundary array delimiting per-example sub-sequences
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of ragged examples, 0 when unbound
    #[must_use]
    pub fn num_examples(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Values of example `i`, or `None` when out of range
    #[must_use]
    pub fn example(&self, i: usize) -> Option<&[f32]> {
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        self.values.get(start..end)
    }
}

/// Contract between the driver and an inference engine
///
/// One handle owns all tensor buffers; it must outlive binding, every
/// execution call, and output collection.
pub trait Engine {
    /// Names of the input tensors the loaded model requires
    fn input_names(&self) -> Vec<String>;

    /// Read access to a named input buffer, `None` for an unknown name
    fn input(&self, name: &str) -> Option<&RaggedTensor>;

    /// Write access to a named input buffer, `None` for an unknown name
    fn input_mut(&mut self, name: &str) -> Option<&mut RaggedTensor>;

    /// Execute one forward pass over the bound inputs
    ///
    /// # Errors
    ///
    /// Returns [`AlimentarError::Engine`] when inputs are unbound or
    /// inconsistent, or when the engine itself fails.
    fn run(&mut self) -> Result<()>;

    /// Names of the model's output tensors
    fn output_names(&self) -> Vec<String>;

    /// Copy a named output (or retained internal variable) to a plain vector
    ///
    /// # Errors
    ///
    /// Returns [`AlimentarError::Fetch`] when the name is not available.
    fn fetch(&self, name: &str) -> Result<Vec<f32>>;
}

/// Engine configuration, resolved before loading
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding `program.bin` and `model.bin`
    pub model_dir: PathBuf,
    /// Whether graph optimization may fuse away internal variables.
    /// Disabled when internal variables must stay fetchable.
    pub ir_optim: bool,
}

impl EngineConfig {
    /// Configuration for a model directory with optimization enabled
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ir_optim: true,
        }
    }

    /// Toggle graph optimization
    #[must_use]
    pub fn with_ir_optim(mut self, ir_optim: bool) -> Self {
        self.ir_optim = ir_optim;
        self
    }
}

/// JSON graph manifest stored in `program.bin`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramManifest {
    /// Input tensor names, one per sparse slot, in parameter order
    pub inputs: Vec<String>,
    /// Output tensor names
    pub outputs: Vec<String>,
    /// Internal variable names retained when optimization is off
    #[serde(default)]
    pub internals: Vec<String>,
}

/// Reference engine: sum-pool each ragged input, apply a linear layer,
/// squash with sigmoid
///
/// Parameters come from `model.bin`: one f32 weight per input in manifest
/// order, followed by a single f32 bias.
#[derive(Debug)]
pub struct SumPoolEngine {
    manifest: ProgramManifest,
    weights: Vec<f32>,
    bias: f32,
    ir_optim: bool,
    inputs: BTreeMap<String, RaggedTensor>,
    variables: BTreeMap<String, Vec<f32>>,
    runs: usize,
}

impl SumPoolEngine {
    /// Load the engine from a model directory
    ///
    /// `program.bin` is parsed as a JSON [`ProgramManifest`]; `model.bin`
    /// is memory-mapped and read as little-endian f32 parameters.
    ///
    /// # Errors
    ///
    /// Returns [`AlimentarError::Engine`] when either artifact is missing,
    /// unparseable, or sized inconsistently with the manifest.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let manifest = read_manifest(&config.model_dir.join("program.bin"))?;
        let params = read_params(&config.model_dir.join("model.bin"))?;

        if params.len() != manifest.inputs.len() + 1 {
            return Err(AlimentarError::Engine(format!(
                "model.bin holds {} parameters, expected {} (one weight per input plus bias)",
                params.len(),
                manifest.inputs.len() + 1
            )));
        }

        Ok(Self::from_parts(manifest, params, config.ir_optim))
    }

    /// Build an engine directly from a manifest and parameter vector
    ///
    /// Used by tests and benchmarks that have no model directory on disk.
    ///
    /// # Panics
    ///
    /// Panics when `params` is not one weight per input plus a bias.
    #[must_use]
    pub fn from_parts(manifest: ProgramManifest, params: Vec<f32>, ir_optim: bool) -> Self {
        assert_eq!(
            params.len(),
            manifest.inputs.len() + 1,
            "one weight per input plus a bias"
        );
        let bias = *params.last().unwrap_or(&0.0);
        let weights = params[..params.len() - 1].to_vec();
        let inputs = manifest
            .inputs
            .iter()
            .map(|name| (name.clone(), RaggedTensor::new()))
            .collect();
        Self {
            manifest,
            weights,
            bias,
            ir_optim,
            inputs,
            variables: BTreeMap::new(),
            runs: 0,
        }
    }

    /// Number of completed execution calls on this handle
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs
    }

    fn check_bound(&self) -> Result<usize> {
        let mut batch: Option<usize> = None;
        for (name, tensor) in &self.inputs {
            if !tensor.is_bound() {
                return Err(AlimentarError::Engine(format!(
                    "input tensor '{name}' was never bound"
                )));
            }
            let n = tensor.num_examples();
            match batch {
                None => batch = Some(n),
                Some(expected) if expected != n => {
                    return Err(AlimentarError::Engine(format!(
                        "input tensor '{name}' holds {n} examples, expected {expected}"
                    )));
                },
                Some(_) => {},
            }
        }
        batch.ok_or_else(|| AlimentarError::Engine("model declares no inputs".to_string()))
    }
}

impl Engine for SumPoolEngine {
    fn input_names(&self) -> Vec<String> {
        self.manifest.inputs.clone()
    }

    fn input(&self, name: &str) -> Option<&RaggedTensor> {
        self.inputs.get(name)
    }

    fn input_mut(&mut self, name: &str) -> Option<&mut RaggedTensor> {
        self.inputs.get_mut(name)
    }

    fn run(&mut self) -> Result<()> {
        let batch = self.check_bound()?;

        // Sum-pool each input per example, then weight, bias, sigmoid.
        let mut linear = vec![self.bias; batch];
        for (idx, name) in self.manifest.inputs.iter().enumerate() {
            let tensor = &self.inputs[name];
            let weight = self.weights[idx];
            for (i, z) in linear.iter_mut().enumerate() {
                let pooled: f32 = tensor
                    .example(i)
                    .unwrap_or(&[])
                    .iter()
                    .sum();
                *z += weight * pooled;
            }
        }

        self.variables.clear();
        if !self.ir_optim {
            // Unoptimized graphs keep intermediate variables addressable.
            for internal in &self.manifest.internals {
                self.variables.insert(internal.clone(), linear.clone());
            }
        }
        let activated: Vec<f32> = linear.iter().map(|z| 1.0 / (1.0 + (-z).exp())).collect();
        for output in &self.manifest.outputs {
            self.variables.insert(output.clone(), activated.clone());
        }

        self.runs += 1;
        Ok(())
    }

    fn output_names(&self) -> Vec<String> {
        self.manifest.outputs.clone()
    }

    fn fetch(&self, name: &str) -> Result<Vec<f32>> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| AlimentarError::Fetch {
                name: name.to_string(),
                reason: "variable not present in the executed graph".to_string(),
            })
    }
}

fn read_manifest(path: &Path) -> Result<ProgramManifest> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AlimentarError::Engine(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| AlimentarError::Engine(format!("failed to parse {}: {e}", path.display())))
}

fn read_params(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path)
        .map_err(|e| AlimentarError::Engine(format!("failed to open {}: {e}", path.display())))?;
    // SAFETY: read-only map over a file we just opened, dropped before return.
    let mmap = unsafe { Mmap::map(&file) }
        .map_err(|e| AlimentarError::Engine(format!("failed to map {}: {e}", path.display())))?;
    if mmap.len() % 4 != 0 {
        return Err(AlimentarError::Engine(format!(
            "{} is {} bytes, not a whole number of f32 parameters",
            path.display(),
            mmap.len()
        )));
    }
    Ok(mmap
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn manifest(inputs: &[&str], outputs: &[&str], internals: &[&str]) -> ProgramManifest {
        ProgramManifest {
            inputs: inputs.iter().map(ToString::to_string).collect(),
            outputs: outputs.iter().map(ToString::to_string).collect(),
            internals: internals.iter().map(ToString::to_string).collect(),
        }
    }

    fn write_model_dir(manifest: &ProgramManifest, params: &[f32]) -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        let json = serde_json::to_string(manifest).expect("manifest json");
        std::fs::write(dir.path().join("program.bin"), json).expect("program.bin");
        let mut file = File::create(dir.path().join("model.bin")).expect("model.bin");
        for p in params {
            file.write_all(&p.to_le_bytes()).expect("param");
        }
        dir
    }

    fn bind(engine: &mut SumPoolEngine, name: &str, values: Vec<f32>, offsets: Vec<usize>) {
        engine
            .input_mut(name)
            .expect("known input")
            .assign(values, offsets)
            .expect("valid layout");
    }

    #[test]
    fn test_ragged_tensor_round_trip() {
        let mut t = RaggedTensor::new();
        assert!(!t.is_bound());
        t.assign(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![0, 2, 5]).unwrap();
        assert!(t.is_bound());
        assert_eq!(t.num_examples(), 2);
        assert_eq!(t.example(0), Some(&[1.0, 2.0][..]));
        assert_eq!(t.example(1), Some(&[3.0, 4.0, 5.0][..]));
    }

    #[test]
    fn test_ragged_tensor_rejects_bad_offsets() {
        let mut t = RaggedTensor::new();
        assert!(t.assign(vec![1.0], vec![1, 1]).is_err());
        assert!(t.assign(vec![1.0, 2.0], vec![0, 1]).is_err());
    }

    #[test]
    fn test_load_from_model_dir() {
        let m = manifest(&["a", "b"], &["sigmoid_0.tmp_0"], &[]);
        let dir = write_model_dir(&m, &[0.5, -0.5, 0.1]);
        let engine = SumPoolEngine::load(&EngineConfig::new(dir.path())).unwrap();
        assert_eq!(engine.input_names(), vec!["a", "b"]);
        assert_eq!(engine.output_names(), vec!["sigmoid_0.tmp_0"]);
    }

    #[test]
    fn test_load_missing_dir() {
        let err = SumPoolEngine::load(&EngineConfig::new("/nonexistent/model")).unwrap_err();
        assert!(matches!(err, AlimentarError::Engine(_)));
    }

    #[test]
    fn test_load_param_count_mismatch() {
        let m = manifest(&["a", "b"], &["out"], &[]);
        let dir = write_model_dir(&m, &[0.5, 0.1]); // missing one weight
        let err = SumPoolEngine::load(&EngineConfig::new(dir.path())).unwrap_err();
        assert!(err.to_string().contains("parameters"));
    }

    #[test]
    fn test_load_ragged_param_file() {
        let m = manifest(&["a"], &["out"], &[]);
        let dir = write_model_dir(&m, &[0.5, 0.1]);
        // Corrupt model.bin to a non-multiple-of-4 length.
        let path = dir.path().join("model.bin");
        std::fs::write(&path, [0u8; 7]).unwrap();
        let err = SumPoolEngine::load(&EngineConfig::new(dir.path())).unwrap_err();
        assert!(err.to_string().contains("f32"));
    }

    #[test]
    fn test_forward_known_values() {
        // One input, weight 1.0, bias 0.0: output = sigmoid(sum(example)).
        let m = manifest(&["x"], &["out"], &[]);
        let mut engine = SumPoolEngine::from_parts(m, vec![1.0, 0.0], true);
        bind(&mut engine, "x", vec![1.0, 1.0, 0.0], vec![0, 2, 3]);
        engine.run().unwrap();

        let out = engine.fetch("out").unwrap();
        assert_eq!(out.len(), 2);
        let expected0 = 1.0 / (1.0 + (-2.0f32).exp());
        assert!((out[0] - expected0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6); // sigmoid(0)
    }

    #[test]
    fn test_run_before_bind_fails() {
        let m = manifest(&["x"], &["out"], &[]);
        let mut engine = SumPoolEngine::from_parts(m, vec![1.0, 0.0], true);
        let err = engine.run().unwrap_err();
        assert!(err.to_string().contains("never bound"));
    }

    #[test]
    fn test_run_detects_inconsistent_batch() {
        let m = manifest(&["x", "y"], &["out"], &[]);
        let mut engine = SumPoolEngine::from_parts(m, vec![1.0, 1.0, 0.0], true);
        bind(&mut engine, "x", vec![1.0], vec![0, 1]);
        bind(&mut engine, "y", vec![1.0, 2.0], vec![0, 1, 2]);
        let err = engine.run().unwrap_err();
        assert!(err.to_string().contains("examples"));
    }

    #[test]
    fn test_internals_retained_only_without_ir_optim() {
        let m = manifest(&["x"], &["out"], &["fc_0.tmp_2"]);

        let mut optimized = SumPoolEngine::from_parts(m.clone(), vec![1.0, 0.0], true);
        bind(&mut optimized, "x", vec![1.0], vec![0, 1]);
        optimized.run().unwrap();
        assert!(optimized.fetch("fc_0.tmp_2").is_err());

        let mut unoptimized = SumPoolEngine::from_parts(m, vec![1.0, 0.0], false);
        bind(&mut unoptimized, "x", vec![3.0], vec![0, 1]);
        unoptimized.run().unwrap();
        let linear = unoptimized.fetch("fc_0.tmp_2").unwrap();
        assert!((linear[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_run_counter_increments() {
        let m = manifest(&["x"], &["out"], &[]);
        let mut engine = SumPoolEngine::from_parts(m, vec![1.0, 0.0], true);
        bind(&mut engine, "x", vec![1.0], vec![0, 1]);
        for _ in 0..3 {
            engine.run().unwrap();
        }
        assert_eq!(engine.runs(), 3);
    }

    #[test]
    fn test_fetch_unknown_name() {
        let m = manifest(&["x"], &["out"], &[]);
        let mut engine = SumPoolEngine::from_parts(m, vec![1.0, 0.0], true);
        bind(&mut engine, "x", vec![1.0], vec![0, 1]);
        engine.run().unwrap();
        let err = engine.fetch("nope").unwrap_err();
        assert!(matches!(err, AlimentarError::Fetch { .. }));
    }

    #[test]
    fn test_manifest_internals_default_empty() {
        let m: ProgramManifest =
            serde_json::from_str(r#"{"inputs":["a"],"outputs":["o"]}"#).unwrap();
        assert!(m.internals.is_empty());
    }
}
