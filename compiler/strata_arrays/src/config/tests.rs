use pretty_assertions::assert_eq;

use super::{BoundsCheckMode, LoweringConfig};

#[test]
fn defaults_check_everything() {
    let config = LoweringConfig::default();
    assert_eq!(config.bounds_checks, BoundsCheckMode::On);
    assert!(config.assertions);
    assert_eq!(config.literal_inline_limit, 4);
    assert!(config.checks_slice_copies());
}

#[test]
fn assertions_alone_keep_checked_copies() {
    let config = LoweringConfig::unchecked().with_assertions(true);
    assert!(!config.bounds_checks.is_enabled());
    assert!(config.checks_slice_copies());
    assert!(!LoweringConfig::unchecked().checks_slice_copies());
}

#[test]
fn builders_override_single_fields() {
    let config = LoweringConfig::default()
        .with_bounds_checks(BoundsCheckMode::Off)
        .with_literal_inline_limit(0);
    assert_eq!(
        config,
        LoweringConfig {
            bounds_checks: BoundsCheckMode::Off,
            assertions: true,
            literal_inline_limit: 0,
        }
    );
    assert_eq!(BoundsCheckMode::Off.to_string(), "off");
}
