//! Config files flowing into coordinator settings.

use std::io::Write;
use std::time::Duration;

use safewrite_config::{ConfigError, SafewriteConfig};
use safewrite_engine::retry_policy;

fn load(contents: &str) -> Result<SafewriteConfig, ConfigError> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    SafewriteConfig::load_from(file.path())
}

#[test]
fn write_section_drives_policy_and_options() {
    let config = load(
        r#"
[write]
key_prefix = "cps"
retries = 2
base_ms = 250
factor = 2.0
jitter = false
conflict_patterns = ["record is stale"]
"#,
    )
    .unwrap();

    let write = config.write_section();
    let policy = retry_policy(&write).unwrap();
    assert_eq!(policy.config.retries, 2);
    assert_eq!(policy.config.base, Duration::from_millis(250));
    assert!(!policy.config.jitter);
    assert!(
        policy
            .classifier
            .classify(Some(400), "Record is stale, reload")
            .is_retryable()
    );
    assert!(!policy.classifier.classify(Some(400), "not saved").is_retryable());

    let options = write.write_options(99);
    assert_eq!(options.key, "cps-99");
    assert_eq!(options.retries, 2);
}

#[test]
fn defaults_apply_without_write_section() {
    let config = load("[scoring]\npriority_points_high = 9\n").unwrap();
    let policy = retry_policy(&config.write_section()).unwrap();

    assert_eq!(policy.config.retries, 3);
    assert_eq!(policy.config.base, Duration::from_millis(400));
    assert!(policy.classifier.classify(Some(422), "Your change was NOT SAVED").is_retryable());
    assert_eq!(config.priority_points().high, 9);
}

#[test]
fn zero_base_is_invalid() {
    let err = load("[write]\nbase_ms = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { section: "write", .. }));
}

#[test]
fn unknown_section_is_a_parse_error() {
    let err = load("[writes]\nretries = 1\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
