//! Address selection over multi-value overrides.
//!
//! Value encoding:
//! - `1.2.3.4` is a fixed answer.
//! - `a/b/c` is a round-robin sequence. The head is served and moved
//!   to the tail.
//! - `a/b%c` is a set of groups. One group is picked uniformly at random
//!   per query. A picked group that is itself a sequence rotates on its
//!   own and the other groups are left as they are.

use rand::Rng;

use crate::error::RotationError;

/// Separates groups picked at random.
pub const GROUP_DELIMITER: char = '%';

/// Separates the elements of a round-robin sequence.
pub const SEQUENCE_DELIMITER: char = '/';

/// Outcome of selecting an address from an override value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    /// Address to serve for this query.
    pub address: String,
    /// Value to persist, when the selection advanced a sequence.
    pub next_value: Option<String>,
}

impl Rotation {
    fn fixed(address: &str) -> Self {
        Self {
            address: address.to_string(),
            next_value: None,
        }
    }
}

/// True when `value` carries any rotation delimiter.
pub fn is_rotating(value: &str) -> bool {
    value.contains(GROUP_DELIMITER) || value.contains(SEQUENCE_DELIMITER)
}

/// Pick the address to serve for `value` and compute its successor.
pub fn select<R: Rng + ?Sized>(value: &str, rng: &mut R) -> Result<Rotation, RotationError> {
    if value.contains(GROUP_DELIMITER) {
        let groups: Vec<&str> = value.split(GROUP_DELIMITER).collect();
        if groups.iter().any(|g| g.is_empty()) {
            return Err(RotationError::EmptyElement(value.to_string()));
        }

        let idx = rng.gen_range(0..groups.len());
        let group = groups[idx];
        if !group.contains(SEQUENCE_DELIMITER) {
            return Ok(Rotation::fixed(group));
        }

        let (head, rotated) = advance(group)?;
        let next_value = groups
            .iter()
            .enumerate()
            .map(|(i, g)| if i == idx { rotated.as_str() } else { *g })
            .collect::<Vec<_>>()
            .join(&GROUP_DELIMITER.to_string());
        Ok(Rotation {
            address: head,
            next_value: Some(next_value),
        })
    } else if value.contains(SEQUENCE_DELIMITER) {
        let (head, rotated) = advance(value)?;
        Ok(Rotation {
            address: head,
            next_value: Some(rotated),
        })
    } else if value.is_empty() {
        Err(RotationError::EmptyElement(value.to_string()))
    } else {
        Ok(Rotation::fixed(value))
    }
}

/// Split off the head of a sequence and move it to the tail.
fn advance(sequence: &str) -> Result<(String, String), RotationError> {
    let elements: Vec<&str> = sequence.split(SEQUENCE_DELIMITER).collect();
    if elements.iter().any(|e| e.is_empty()) {
        return Err(RotationError::EmptyElement(sequence.to_string()));
    }

    let (head, rest) = elements.split_at(1);
    let rotated = rest
        .iter()
        .chain(head)
        .copied()
        .collect::<Vec<_>>()
        .join(&SEQUENCE_DELIMITER.to_string());
    Ok((head[0].to_string(), rotated))
}
