// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration handling

use viewfinder::Config;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.last_camera_index, 0);
    assert_eq!((config.width, config.height), (640, 480));
    assert!(
        config.mirror_preview,
        "mirror preview should be enabled by default"
    );
}

#[test]
fn test_config_json_round_trip() {
    let config = Config {
        last_camera_index: 2,
        width: 1280,
        height: 720,
        mirror_preview: false,
    };

    let json = serde_json::to_string(&config).unwrap();
    let restored: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, config);
}

#[test]
fn test_unknown_fields_are_tolerated() {
    // Older or newer config files must not break loading
    let restored: Config =
        serde_json::from_str(r#"{"width": 320, "legacy_option": true}"#).unwrap();
    assert_eq!(restored.width, 320);
    assert_eq!(restored.height, 480);
}
