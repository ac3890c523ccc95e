//! Slot-to-tensor binding
//!
//! Writes parsed [`Slot`]s into the engine's correspondingly named ragged
//! input buffers. Name mismatches in either direction are fatal, and the
//! binder enforces that every slot carries the same example count so that
//! example `i` lines up across all bound tensors.

use std::collections::HashSet;

use crate::engine::Engine;
use crate::error::{BindingError, Result};
use crate::slot::Slot;

/// Bind every slot into the engine input tensor of the same name
///
/// Bindings are written in place into engine-owned buffers; the engine
/// handle must outlive all subsequent execution calls.
///
/// # Errors
///
/// - [`BindingError::UnknownTensor`] when a slot names an input the model
///   does not declare;
/// - [`BindingError::MissingSlot`] when a required input has no slot;
/// - [`BindingError::ExampleCountMismatch`] when slots disagree on the
///   number of ragged examples.
pub fn bind_slots(engine: &mut dyn Engine, slots: &[Slot]) -> Result<()> {
    let required = engine.input_names();
    let required_set: HashSet<&str> = required.iter().map(String::as_str).collect();

    for slot in slots {
        if !required_set.contains(slot.name()) {
            return Err(BindingError::UnknownTensor {
                name: slot.name().to_string(),
            }
            .into());
        }
    }

    let provided: HashSet<&str> = slots.iter().map(Slot::name).collect();
    for name in &required {
        if !provided.contains(name.as_str()) {
            return Err(BindingError::MissingSlot { name: name.clone() }.into());
        }
    }

    // Cross-slot offset consistency: every tensor must describe the same
    // batch of logical examples.
    if let Some(first) = slots.first() {
        let expected = first.num_examples();
        for slot in &slots[1..] {
            if slot.num_examples() != expected {
                return Err(BindingError::ExampleCountMismatch {
                    name: slot.name().to_string(),
                    expected,
                    actual: slot.num_examples(),
                }
                .into());
            }
        }
    }

    for slot in slots {
        let tensor = engine
            .input_mut(slot.name())
            .ok_or_else(|| BindingError::UnknownTensor {
                name: slot.name().to_string(),
            })?;
        tensor.assign(slot.values().to_vec(), slot.offsets().to_vec())?;
    }

    Ok(())
}
