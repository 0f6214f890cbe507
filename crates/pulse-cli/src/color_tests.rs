// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn no_color_env_disables_regardless_of_tty() {
    std::env::set_var("NO_COLOR", "1");
    std::env::remove_var("COLOR");
    assert!(!should_colorize());
    std::env::remove_var("NO_COLOR");
}

#[test]
#[serial]
fn color_env_forces_on() {
    std::env::remove_var("NO_COLOR");
    std::env::set_var("COLOR", "1");
    assert!(should_colorize());
    std::env::remove_var("COLOR");
}

#[test]
#[serial]
fn plain_styles_when_colorization_disabled() {
    std::env::set_var("NO_COLOR", "1");
    let built = styles();
    assert_eq!(format!("{built:?}"), format!("{:?}", clap::builder::styling::Styles::plain()));
    std::env::remove_var("NO_COLOR");
}
