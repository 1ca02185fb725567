use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use icschart::application::ApplicationError;
use icschart::config::{Settings, MIN_SUPERSAMPLE};
use icschart::util::testing::init_test_setup;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn given_config_file_when_loading_then_file_values_applied() {
    init_test_setup();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("icschart.toml");
    fs::write(
        &path,
        r#"
default_template = "Wildfire"

[layout]
node_width = 200.0

[export]
supersample = 4
output_dir = "/srv/charts"
"#,
    )
    .unwrap();

    let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();

    assert_eq!(settings.default_template, "Wildfire");
    assert_eq!(settings.layout.node_width, 200.0);
    assert_eq!(settings.layout.node_height, 96.0);
    assert_eq!(settings.export.supersample, 4);
    assert_eq!(settings.export.output_dir, PathBuf::from("/srv/charts"));
}

#[test]
fn given_env_and_file_when_loading_then_env_wins() {
    init_test_setup();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("icschart.toml");
    fs::write(&path, "[export]\npadding = 40.0\n").unwrap();

    let settings = Settings::load_with_env(
        Some(&path),
        env(&[
            ("ICSCHART_EXPORT__PADDING", "12"),
            ("ICSCHART_DEFAULT_TEMPLATE", "Flood"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.export.padding, 12.0);
    assert_eq!(settings.default_template, "Flood");
}

#[test]
fn given_low_supersample_in_file_when_loading_then_clamped() {
    init_test_setup();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("icschart.toml");
    fs::write(&path, "[export]\nsupersample = 1\n\n[viewport]\nmin = 3.0\nmax = 1.0\n").unwrap();

    let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();

    assert_eq!(settings.export.supersample, MIN_SUPERSAMPLE);
    assert_eq!(settings.viewport, Settings::default().viewport);
}

#[test]
fn given_missing_explicit_file_when_loading_then_config_error() {
    init_test_setup();
    let tmp = TempDir::new().unwrap();

    let err = Settings::load_with_env(Some(&tmp.path().join("nope.toml")), env(&[])).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_malformed_file_when_loading_then_config_error() {
    init_test_setup();
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("icschart.toml");
    fs::write(&path, "[export\nsupersample = ").unwrap();

    let err = Settings::load_with_env(Some(&path), env(&[])).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[test]
fn given_template_text_when_parsed_then_valid_toml() {
    let parsed: toml::Value = toml::from_str(&Settings::template()).unwrap();
    assert!(parsed.get("export").is_some());
}
