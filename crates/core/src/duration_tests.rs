// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    secs_30s      = { "30s",     Duration::from_secs(30) },
    secs_word     = { "2seconds", Duration::from_secs(2) },
    mins_5m       = { "5m",      Duration::from_secs(300) },
    mins_word     = { "1minute", Duration::from_secs(60) },
    hours_1h      = { "1h",      Duration::from_secs(3600) },
    days_1d       = { "1d",      Duration::from_secs(86400) },
    bare_number   = { "30",      Duration::from_secs(30) },
    ws_leading    = { " 30s ",   Duration::from_secs(30) },
    ws_middle     = { "30 s",    Duration::from_secs(30) },
    ms_500        = { "500ms",   Duration::from_millis(500) },
    ms_0          = { "0ms",     Duration::from_millis(0) },
)]
fn parse_duration_valid(input: &str, expected: Duration) {
    assert_eq!(parse_duration(input).unwrap(), expected);
}

#[yare::parameterized(
    invalid_suffix = { "30x" },
    empty_string   = { "" },
    invalid_number = { "abcs" },
    negative       = { "-5s" },
    overflow       = { "18446744073709551615m" },
)]
fn parse_duration_invalid(input: &str) {
    assert!(parse_duration(input).is_err());
}

#[yare::parameterized(
    zero     = { Duration::ZERO,               "0s" },
    millis   = { Duration::from_millis(250),   "250ms" },
    seconds  = { Duration::from_secs(45),      "45s" },
    minutes  = { Duration::from_secs(600),     "10m" },
    hours    = { Duration::from_secs(7200),    "2h" },
    days     = { Duration::from_secs(172_800), "2d" },
    mixed    = { Duration::from_secs(90),      "90s" },
)]
fn format_duration_picks_largest_unit(d: Duration, expected: &str) {
    assert_eq!(format_duration(d), expected);
    assert_eq!(parse_duration(expected).unwrap(), d);
}
