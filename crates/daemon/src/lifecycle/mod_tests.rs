// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
fn layout_lives_under_the_state_dir() {
    let config = Config::for_state_dir("/var/lib/ew");

    assert_eq!(config.lock_path, PathBuf::from("/var/lib/ew/ewd.pid"));
    assert_eq!(config.settings_path, PathBuf::from("/var/lib/ew/ewd.toml"));
    assert_eq!(config.handoff_dir, PathBuf::from("/var/lib/ew/run/handoff"));
    assert_eq!(config.feedback_dir, PathBuf::from("/var/lib/ew/run/feedback"));
}

#[test]
#[serial]
fn explicit_settings_path_wins() {
    std::env::set_var("EW_STATE_DIR", "/tmp/ew-lifecycle");
    let config = Config::load(Some(PathBuf::from("/etc/ewd.toml"))).unwrap();
    std::env::remove_var("EW_STATE_DIR");

    assert_eq!(config.state_dir, PathBuf::from("/tmp/ew-lifecycle"));
    assert_eq!(config.settings_path, PathBuf::from("/etc/ewd.toml"));
    assert_eq!(config.lock_path, PathBuf::from("/tmp/ew-lifecycle/ewd.pid"));
}
