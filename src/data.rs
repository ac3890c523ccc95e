//! Feature file reader
//!
//! Parses a line-oriented sparse feature file into [`Slot`]s, restricted to
//! an inclusive 1-based line range. Lines are streamed through a `BufReader`
//! rather than loading the whole file, so a large dataset with a narrow
//! range stays cheap.
//!
//! # Line grammar
//!
//! Tokens are whitespace separated. A line holds one or more records:
//!
//! ```text
//! name count v1 .. v_count [name count v1 .. v_count ...]
//! ```
//!
//! As a compatibility form, a line of exactly `name v1 .. vN` (second token
//! not an integer) is a single record whose count is the remaining token
//! count. Each record appends one ragged example to the slot of that name;
//! slots keep first-encounter order across the whole range.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{AlimentarError, Result};
use crate::slot::Slot;

/// A bounded view over a sparse feature file
///
/// # Examples
///
/// ```no_run
/// use alimentar::Dataset;
///
/// let dataset = Dataset::new("data/sample.data", 1, 1_000_000).unwrap();
/// let slots = dataset.read_slots().unwrap();
/// for slot in &slots {
///     println!("{}: {} examples", slot.name(), slot.num_examples());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    start_line: usize,
    end_line: usize,
}

impl Dataset {
    /// Create a dataset over `[start_line, end_line]` (inclusive, 1-based)
    ///
    /// A `start_line` of 0 is clamped to 1. A range past the end of the
    /// file yields an empty slot list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`AlimentarError::Config`] when `start_line > end_line`.
    pub fn new(path: impl AsRef<Path>, start_line: usize, end_line: usize) -> Result<Self> {
        let start_line = start_line.max(1);
        if start_line > end_line {
            return Err(AlimentarError::Config {
                reason: format!("start_line {start_line} exceeds end_line {end_line}"),
            });
        }
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            start_line,
            end_line,
        })
    }

    /// Path of the underlying feature file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the lines in range into slots, in first-encounter order
    ///
    /// # Errors
    ///
    /// Returns [`AlimentarError::Parse`] naming the 1-based line number of
    /// the first malformed line, or [`AlimentarError::Io`] when the file
    /// cannot be read.
    pub fn read_slots(&self) -> Result<Vec<Slot>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut slots: Vec<Slot> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line_no = line_no + 1;
            if line_no > self.end_line {
                break;
            }
            let line = line?;
            if line_no < self.start_line {
                continue;
            }
            parse_line(&line, line_no, &mut slots, &mut index)?;
        }

        Ok(slots)
    }
}

/// Parse one line's records and append each as a ragged example.
fn parse_line(
    line: &str,
    line_no: usize,
    slots: &mut Vec<Slot>,
    index: &mut HashMap<String, usize>,
) -> Result<()> {
    let malformed = |reason: String| AlimentarError::Parse {
        line: line_no,
        reason,
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        // Blank lines carry no records.
        return Ok(());
    }

    let mut pos = 0;
    while pos < tokens.len() {
        let name = tokens[pos];
        pos += 1;

        let Some(&next) = tokens.get(pos) else {
            return Err(malformed(format!("record '{name}' has no values")));
        };

        let values = if let Ok(count) = next.parse::<usize>() {
            pos += 1;
            let end = pos
                .checked_add(count)
                .filter(|&end| end <= tokens.len())
                .ok_or_else(|| {
                    malformed(format!(
                        "record '{name}' declares {count} values but only {} remain",
                        tokens.len() - pos
                    ))
                })?;
            let values = parse_values(&tokens[pos..end], name, line_no)?;
            pos = end;
            values
        } else {
            // Compatibility form: the rest of the line is one record.
            let values = parse_values(&tokens[pos..], name, line_no)?;
            pos = tokens.len();
            values
        };

        let slot_idx = *index.entry(name.to_string()).or_insert_with(|| {
            slots.push(Slot::empty(name));
            slots.len() - 1
        });
        slots[slot_idx].push_example(&values);
    }

    Ok(())
}

fn parse_values(tokens: &[&str], name: &str, line_no: usize) -> Result<Vec<f32>> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<f32>().map_err(|_| AlimentarError::Parse {
                line: line_no,
                reason: format!("record '{name}' has non-numeric value '{t}'"),
            })
        })
        .collect()
}
