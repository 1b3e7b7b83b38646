// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker outcome reported back to the launcher.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest feedback message kept, in bytes.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Longest status code kept, in bytes.
pub const MAX_STATUS_LEN: usize = 32;

/// Status codes written by the built-in worker.
pub mod status {
    /// Job completed successfully
    pub const OK: &str = "OK";
    /// Job payload failed
    pub const ERR: &str = "ERR";
    /// Job exceeded its timeout
    pub const TIMEOUT: &str = "TIMEOUT";
    /// Worker was asked to stop while the job ran
    pub const TERMINATED: &str = "TERMINATED";
    /// Payload could not be started
    pub const EXEC: &str = "EXEC";
}

/// Domain-specific result code, bounded to [`MAX_STATUS_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(String);

impl StatusCode {
    pub fn new(code: impl Into<String>) -> Self {
        let mut code = code.into();
        let len = truncate_utf8(&code, MAX_STATUS_LEN).len();
        code.truncate(len);
        Self(code)
    }

    pub fn ok() -> Self {
        Self::new(status::OK)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_ok(&self) -> bool {
        self.0 == status::OK
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatusCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<&str> for StatusCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One worker's last word: exit code, status, and message.
///
/// The table slot holding it also carries a `consumed` flag; that flag
/// belongs to the slot, not to the record handed to the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub exit_code: i32,
    pub status: StatusCode,
    pub message: String,
}

impl FeedbackRecord {
    /// Build a record, truncating `message` to [`MAX_MESSAGE_LEN`] bytes.
    pub fn new(exit_code: i32, status: impl Into<StatusCode>, message: impl Into<String>) -> Self {
        let mut message = message.into();
        let len = truncate_utf8(&message, MAX_MESSAGE_LEN).len();
        message.truncate(len);
        Self { exit_code, status: status.into(), message }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.status.is_ok()
    }
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char boundary.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;
