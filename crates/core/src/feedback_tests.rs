// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    short         = { "abc",  2, "ab" },
    fits          = { "abc",  3, "abc" },
    zero          = { "abc",  0, "" },
    mid_codepoint = { "aé",   2, "a" },
    after_multi   = { "aéb",  3, "aé" },
    emoji         = { "🐘🐘", 5, "🐘" },
)]
fn truncate_utf8_respects_boundaries(input: &str, max: usize, expected: &str) {
    assert_eq!(truncate_utf8(input, max), expected);
}

#[test]
fn record_truncates_long_message() {
    let record = FeedbackRecord::new(1, status::ERR, "x".repeat(MAX_MESSAGE_LEN + 100));
    assert_eq!(record.message.len(), MAX_MESSAGE_LEN);
}

#[test]
fn record_truncates_multibyte_message_on_char_boundary() {
    let message = "é".repeat(MAX_MESSAGE_LEN);
    let record = FeedbackRecord::new(1, status::ERR, message);
    assert!(record.message.len() <= MAX_MESSAGE_LEN);
    assert!(record.message.chars().all(|c| c == 'é'));
}

#[test]
fn status_code_is_bounded() {
    let code = StatusCode::new("S".repeat(100));
    assert_eq!(code.as_str().len(), MAX_STATUS_LEN);
}

#[test]
fn success_requires_zero_exit_and_ok_status() {
    assert!(FeedbackRecord::new(0, status::OK, "done").is_success());
    assert!(!FeedbackRecord::new(0, status::ERR, "").is_success());
    assert!(!FeedbackRecord::new(3, status::OK, "").is_success());
}

#[test]
fn status_code_compares_with_str() {
    let record = FeedbackRecord::new(1, "ERR", "timeout");
    assert_eq!(record.status, "ERR");
}
