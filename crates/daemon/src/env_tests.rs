// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

struct EnvGuard(Vec<(&'static str, Option<String>)>);

impl EnvGuard {
    fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
        let saved = vars.iter().map(|(k, _)| (*k, std::env::var(k).ok())).collect();
        for (key, value) in vars {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        Self(saved)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.0 {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    let _env =
        EnvGuard::set(&[("EW_STATE_DIR", Some("/tmp/ew-a")), ("XDG_STATE_HOME", Some("/x"))]);
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/ew-a"));
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    let _env = EnvGuard::set(&[("EW_STATE_DIR", None), ("XDG_STATE_HOME", Some("/xdg"))]);
    assert_eq!(state_dir().unwrap(), PathBuf::from("/xdg/ew"));
}

#[test]
#[serial]
fn settings_path_defaults_under_state_dir() {
    let _env = EnvGuard::set(&[("EW_CONFIG", None)]);
    assert_eq!(settings_path(Path::new("/s")), PathBuf::from("/s/ewd.toml"));

    let _env = EnvGuard::set(&[("EW_CONFIG", Some("/etc/ewd.toml"))]);
    assert_eq!(settings_path(Path::new("/s")), PathBuf::from("/etc/ewd.toml"));
}

#[test]
#[serial]
fn drain_timeout_override() {
    let cases = [
        (None, None),
        (Some("250"), Some(Duration::from_millis(250))),
        (Some("soon"), None),
    ];
    for (raw, expected) in cases {
        let _env = EnvGuard::set(&[("EW_DRAIN_TIMEOUT_MS", raw)]);
        assert_eq!(drain_timeout(), expected, "EW_DRAIN_TIMEOUT_MS={raw:?}");
    }
}

#[test]
#[serial]
fn log_filter_prefers_ew_log() {
    let _env = EnvGuard::set(&[("EW_LOG", Some("debug")), ("RUST_LOG", Some("warn"))]);
    assert_eq!(log_filter(), "debug");

    let _env = EnvGuard::set(&[("EW_LOG", None)]);
    assert_eq!(log_filter(), "warn");

    let _env = EnvGuard::set(&[("RUST_LOG", None)]);
    assert_eq!(log_filter(), "info");
}
