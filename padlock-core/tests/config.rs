use padlock_core::{PadlockConfig, PadlockError};

#[test]
fn test_defaults() {
    let config = PadlockConfig::new();
    assert_eq!(config.database_url, None);
    assert_eq!(config.max_connections, 5);
    assert_eq!(config.grant_retry_limit, 3);
    assert_eq!(config.default_action, "index");
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_yaml_section() {
    let yaml = r#"
app:
  name: projects
padlock:
  database_url: "sqlite://roles.db"
  grant_retry_limit: 5
"#;
    let config = PadlockConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.database_url.as_deref(), Some("sqlite://roles.db"));
    assert_eq!(config.grant_retry_limit, 5);
    assert_eq!(config.max_connections, 5);
    assert_eq!(config.default_action, "index");
}

#[test]
fn test_missing_section_yields_defaults() {
    let config = PadlockConfig::from_yaml_str("app:\n  name: projects\n").unwrap();
    assert_eq!(config.grant_retry_limit, 3);
}

#[test]
fn test_unknown_key_rejected() {
    let err = PadlockConfig::from_yaml_str("padlock:\n  retries: 2\n").unwrap_err();
    assert!(matches!(err, PadlockError::InvalidConfig(_)));
}

#[test]
fn test_validate_rejects_bad_values() {
    assert!(PadlockConfig::new().with_max_connections(0).validate().is_err());
    assert!(PadlockConfig::new().with_default_action("").validate().is_err());
    assert!(PadlockConfig::new().with_database_url("").validate().is_err());

    let err = PadlockConfig::from_yaml_str("padlock:\n  max_connections: 0\n").unwrap_err();
    assert!(matches!(err, PadlockError::InvalidConfig(_)));
}
