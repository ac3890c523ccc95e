//! Sparse feature slots
//!
//! A [`Slot`] is a named group of feature values for one batch of inference
//! examples. Variable-length per-example sub-sequences are encoded with a
//! flat value array plus a CSR-style boundary array: example `i` owns
//! `values[offsets[i]..offsets[i + 1]]`.

use crate::error::{BindingError, Result};

/// Check the ragged-layout invariant for an offset array.
///
/// Offsets must be non-decreasing, start at 0, and end at the total value
/// count. Used by both [`Slot`] and the engine's ragged input buffers.
///
/// # Errors
///
/// Returns [`BindingError::InvalidOffsets`] naming the violated rule.
pub fn validate_offsets(
    name: &str,
    value_count: usize,
    offsets: &[usize],
) -> std::result::Result<(), BindingError> {
    let invalid = |reason: String| BindingError::InvalidOffsets {
        name: name.to_string(),
        reason,
    };

    if offsets.is_empty() {
        return Err(invalid("offsets must contain at least [0]".to_string()));
    }
    if offsets[0] != 0 {
        return Err(invalid(format!("offsets must start at 0, got {}", offsets[0])));
    }
    if let Some(w) = offsets.windows(2).find(|w| w[0] > w[1]) {
        return Err(invalid(format!(
            "offsets must be non-decreasing, found {} before {}",
            w[0], w[1]
        )));
    }
    let last = *offsets.last().unwrap_or(&0);
    if last != value_count {
        return Err(invalid(format!(
            "offsets must end at the value count {value_count}, got {last}"
        )));
    }
    Ok(())
}

/// A named sparse feature group with ragged per-example values
///
/// # Examples
///
/// ```
/// use alimentar::Slot;
///
/// let slot = Slot::new("ad_click", vec![1.0, 2.0, 3.0], vec![0, 2, 3]).unwrap();
/// assert_eq!(slot.num_examples(), 2);
/// assert_eq!(slot.example(0), Some(&[1.0, 2.0][..]));
/// assert_eq!(slot.example(1), Some(&[3.0][..]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    name: String,
    values: Vec<f32>,
    offsets: Vec<usize>,
}

impl Slot {
    /// Create a slot from a value array and an offset array
    ///
    /// # Errors
    ///
    /// Returns an error when the offsets violate the ragged-layout
    /// invariant (see [`validate_offsets`]).
    pub fn new(name: impl Into<String>, values: Vec<f32>, offsets: Vec<usize>) -> Result<Self> {
        let name = name.into();
        validate_offsets(&name, values.len(), &offsets)?;
        Ok(Self {
            name,
            values,
            offsets,
        })
    }

    /// Create an empty slot holding zero examples
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            offsets: vec![0],
        }
    }

    /// Append one ragged example to the end of the slot
    pub fn push_example(&mut self, example: &[f32]) {
        self.values.extend_from_slice(example);
        self.offsets.push(self.values.len());
    }

    /// Slot name, matching an engine input tensor name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flat value array in example order
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// CSR-style boundary array delimiting per-example sub-sequences
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of ragged examples held by the slot
    #[must_use]
    pub fn num_examples(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Values of example `i`, or `None` when out of range
    #[must_use]
    pub fn example(&self, i: usize) -> Option<&[f32]> {
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        self.values.get(start..end)
    }
}
