//! Error types for the alimentar inference driver
//!
//! The taxonomy mirrors the pipeline stages: parsing the feature file,
//! binding slots into engine tensors, executing the engine, and fetching
//! named outputs. Fetch failures are the only recoverable case and are
//! always scoped to a single variable name.

use thiserror::Error;

/// Errors raised while binding slots into engine-owned input tensors
#[derive(Debug, Error)]
pub enum BindingError {
    /// A model input has no matching slot in the dataset
    #[error("No slot found for required input tensor '{name}'")]
    MissingSlot {
        /// Name of the unmatched input tensor
        name: String,
    },

    /// A slot references an input tensor the model does not declare
    #[error("Slot '{name}' does not match any input tensor of the model")]
    UnknownTensor {
        /// Name of the unmatched slot
        name: String,
    },

    /// Two slots disagree on the number of ragged examples
    #[error("Slot '{name}' has {actual} examples, expected {expected}")]
    ExampleCountMismatch {
        /// Name of the offending slot
        name: String,
        /// Example count established by the first slot
        expected: usize,
        /// Example count found in this slot
        actual: usize,
    },

    /// An offset array violates the ragged-layout invariant
    #[error("Invalid offsets for '{name}': {reason}")]
    InvalidOffsets {
        /// Name of the slot or tensor being laid out
        name: String,
        /// Which part of the invariant was violated
        reason: String,
    },
}

/// Top-level error type for all pipeline stages
#[derive(Debug, Error)]
pub enum AlimentarError {
    /// Malformed line in the feature file
    #[error("Parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number of the offending line
        line: usize,
        /// Description of the malformation
        reason: String,
    },

    /// Slot/tensor name or layout mismatch during binding
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// A named output could not be fetched (non-fatal, per name)
    #[error("Failed to fetch variable '{name}': {reason}")]
    Fetch {
        /// Requested output or internal variable name
        name: String,
        /// Why the fetch failed
        reason: String,
    },

    /// Opaque failure surfaced by the engine during load or execution
    #[error("Engine error: {0}")]
    Engine(String),

    /// Invalid run configuration (line range, iteration count)
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Description of the invalid setting
        reason: String,
    },

    /// File access failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AlimentarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_line() {
        let err = AlimentarError::Parse {
            line: 17,
            reason: "bad float".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("17"));
        assert!(msg.contains("bad float"));
    }

    #[test]
    fn test_binding_error_display_includes_name() {
        let err = BindingError::MissingSlot {
            name: "click_7".to_string(),
        };
        assert!(err.to_string().contains("click_7"));

        let err = BindingError::ExampleCountMismatch {
            name: "show_3".to_string(),
            expected: 4,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("show_3"));
        assert!(msg.contains('4'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn test_binding_error_converts_to_top_level() {
        let err: AlimentarError = BindingError::UnknownTensor {
            name: "bogus".to_string(),
        }
        .into();
        assert!(matches!(err, AlimentarError::Binding(_)));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AlimentarError = io.into();
        assert!(matches!(err, AlimentarError::Io(_)));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = AlimentarError::Fetch {
            name: "fc_0.tmp_2".to_string(),
            reason: "not an output of the model".to_string(),
        };
        assert!(err.to_string().contains("fc_0.tmp_2"));
    }
}
