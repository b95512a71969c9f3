use std::fs;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::load_config_from;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.broker.buffer_size, 100);
    assert_eq!(settings.subscriber.retry_count, 3);
    assert_eq!(settings.subscriber.inactive_time_secs, 300);
    assert_eq!(settings.message.ttl_secs, 3600);
    assert_eq!(settings.log.level, "info");
}

#[test]
fn test_broker_config_conversion() {
    let settings = Settings::default();
    let cfg = settings.broker_config();
    assert_eq!(cfg.buffer_size, 100);
    assert_eq!(cfg.delivery.retry_count, 3);
    assert_eq!(cfg.delivery.retry_interval, Duration::from_secs(1));
    assert_eq!(cfg.inactive_time, Duration::from_secs(300));
    assert_eq!(cfg.message_ttl, Duration::from_secs(3600));
    assert_eq!(settings.request_timeout(), Duration::from_secs(5));
    assert_eq!(settings.bind_addr(), "127.0.0.1:8080");
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("absent");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.message.cleanup_interval_secs, 60);
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("broker.toml");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        buffer_size = 2

        [subscriber]
        retry_count = 7
        inactive_time_secs = 10

        [message]
        ttl_secs = 60
    "#;
    fs::write(&path, toml).expect("write config file");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.broker.buffer_size, 2);
    assert_eq!(cfg.subscriber.retry_count, 7);
    assert_eq!(cfg.subscriber.inactive_time_secs, 10);
    // untouched keys keep their defaults
    assert_eq!(cfg.subscriber.retry_interval_ms, 1000);
    assert_eq!(cfg.message.ttl_secs, 60);
    assert_eq!(cfg.log.level, "info");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("broker.toml");
    fs::write(&path, "[subscriber]\nretry_count = 7\n").expect("write config file");

    temp_env::with_vars(
        [
            ("PUSHSUB_SUBSCRIBER__RETRY_COUNT", Some("5")),
            ("PUSHSUB_LOG__LEVEL", Some("debug")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.subscriber.retry_count, 5);
            assert_eq!(cfg.log.level, "debug");
        },
    );
}
