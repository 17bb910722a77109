//! Command surface of [`crate::Speaker`]
//!
//! Positions taken by commands are 1-based, as shown to users; they are
//! validated against the known queue length and converted with
//! [`crate::model::api_position`] before being sent. Validation failures are
//! returned before anything is sent to the server.

mod library;
mod playback;
mod playlist;
mod queue;

use crate::error::{Result, StateError};

/// Reject an unknown or empty queue
pub(crate) fn require_queue(length: Option<usize>) -> Result<usize> {
    match length {
        Some(length) if length > 0 => Ok(length),
        _ => Err(StateError::validation("Queue is empty")),
    }
}

/// Check that a 1-based position lies within `1..=length`
pub(crate) fn validate_position(position: usize, length: Option<usize>) -> Result<()> {
    let length = require_queue(length)?;
    if position < 1 || position > length {
        return Err(StateError::validation(format!(
            "Position {} is out of range. Valid range is 1 to {}",
            position, length
        )));
    }
    Ok(())
}
