// Config loading and validation tests

use bwmon::config::{AppConfig, WidthOverride};
use bwmon::filter::InterfaceFilter;
use bwmon::models::CounterWidth;
use bwmon::output::{OutputMode, Statistic, Unit};
use bwmon::sources::SourceKind;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[sampling]
interval_secs = 0.25
average_window_ms = 10000
adapter_timeout_ms = 200
stats_log_interval_secs = 30

[sources]
order = ["sysfs", "proc_net_dev", "netstat"]
sysfs_path = "/tmp/fake-sys/class/net"
counter_width = "32"
max_bytes_per_sec = 1.25e9
max_bytes_per_sec_32 = 1.25e8

[interfaces]
filter = "%lo,veth*"
stale_after_ticks = 2
forget_after_ticks = 20
sum_hidden = true

[output]
mode = "csv"
unit = "bits"
statistic = "average"
dynamic_units = false
count = 10
csv_delimiter = ","
file = "/tmp/bwmon.csv"

[server]
port = 9090
host = "0.0.0.0"
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.sample_interval(), Duration::from_millis(250));
    assert_eq!(config.adapter_timeout(), Duration::from_millis(200));
    assert_eq!(
        config.sources.order,
        [SourceKind::Sysfs, SourceKind::ProcNetDev, SourceKind::Netstat]
    );
    assert_eq!(config.sources.counter_width, WidthOverride::Bits32);
    assert_eq!(config.output.mode, OutputMode::Csv);
    assert_eq!(config.output.unit, Unit::Bits);
    assert_eq!(config.output.statistic, Statistic::Average);
    assert_eq!(config.output.count, 10);
    assert_eq!(config.server.port, 9090);
}

#[test]
fn test_registry_config_follows_file() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("valid");
    let registry = config.registry_config();
    assert_eq!(registry.window, Duration::from_secs(10));
    assert_eq!(registry.width_override, Some(CounterWidth::Bits32));
    assert_eq!(registry.limits.max_bytes_per_sec, 1.25e9);
    assert_eq!(registry.limits.max_bytes_per_sec_32, 1.25e8);
    assert_eq!(registry.limits.max_packets_per_sec_32, 15_000_000.0);
    assert_eq!(registry.stale_after_ticks, 2);
    assert_eq!(registry.forget_after_ticks, 20);
    assert!(registry.sum_hidden);
    assert_eq!(
        registry.filter,
        InterfaceFilter::Hide(vec!["lo".into(), "veth*".into()])
    );
    assert!(!registry.filter.is_visible("veth12ab"));
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = AppConfig::load_from_str("").expect("defaults");
    assert_eq!(config.sample_interval(), Duration::from_millis(500));
    assert_eq!(config.sampling.average_window_ms, 30_000);
    assert_eq!(config.sampling.stuck_after_ticks, 3);
    assert_eq!(config.sources.counter_width, WidthOverride::Auto);
    assert_eq!(config.sources.order, SourceKind::default_order());
    assert_eq!(config.interfaces.filter, InterfaceFilter::All);
    assert_eq!(config.interfaces.stale_after_ticks, 1);
    assert_eq!(config.interfaces.forget_after_ticks, 10);
    assert_eq!(config.output.mode, OutputMode::Plain);
    assert_eq!(config.output.unit, Unit::Bytes);
    assert_eq!(config.output.statistic, Statistic::Rate);
    assert_eq!(config.output.csv_delimiter, ";");
    assert_eq!(config.server.port, 8686);
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 9090", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_bad_interval() {
    for value in ["0.0", "-1.0", "1e12", "nan"] {
        let bad = VALID_CONFIG.replace("interval_secs = 0.25", &format!("interval_secs = {value}"));
        let err = AppConfig::load_from_str(&bad).unwrap_err();
        assert!(
            err.to_string().contains("sampling.interval_secs"),
            "{value}: {err}"
        );
    }
}

#[test]
fn test_config_validation_rejects_sub_millisecond_interval() {
    for value in ["1e-10", "0.0004"] {
        let bad = VALID_CONFIG.replace("interval_secs = 0.25", &format!("interval_secs = {value}"));
        let err = AppConfig::load_from_str(&bad).unwrap_err();
        assert!(err.to_string().contains("at least 1ms"), "{value}: {err}");
    }

    let fast = VALID_CONFIG.replace("interval_secs = 0.25", "interval_secs = 0.001");
    let config = AppConfig::load_from_str(&fast).unwrap();
    assert_eq!(config.sample_interval(), Duration::from_millis(1));
}

#[test]
fn test_config_validation_rejects_zero_window_and_timeout() {
    let bad = VALID_CONFIG.replace("average_window_ms = 10000", "average_window_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("average_window_ms"));

    let bad = VALID_CONFIG.replace("adapter_timeout_ms = 200", "adapter_timeout_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("adapter_timeout_ms"));
}

#[test]
fn test_config_validation_rejects_empty_source_order() {
    let bad = VALID_CONFIG.replace(
        r#"order = ["sysfs", "proc_net_dev", "netstat"]"#,
        "order = []",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sources.order"));
}

#[test]
fn test_config_validation_rejects_unknown_source() {
    let bad = VALID_CONFIG.replace(r#""netstat"]"#, r#""wmi"]"#);
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_validation_rejects_forget_before_stale() {
    let bad = VALID_CONFIG.replace("forget_after_ticks = 20", "forget_after_ticks = 1");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("forget_after_ticks"));

    let bad = VALID_CONFIG.replace("stale_after_ticks = 2", "stale_after_ticks = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stale_after_ticks"));
}

#[test]
fn test_config_validation_rejects_non_positive_ceiling() {
    let bad = VALID_CONFIG.replace("max_bytes_per_sec = 1.25e9", "max_bytes_per_sec = 0.0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_bytes_per_sec"));

    let bad = VALID_CONFIG.replace("max_bytes_per_sec_32 = 1.25e8", "max_bytes_per_sec_32 = -1.0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_bytes_per_sec_32"));
}

#[test]
fn test_config_validation_rejects_empty_delimiter() {
    let bad = VALID_CONFIG.replace(r#"csv_delimiter = ",""#, r#"csv_delimiter = """#);
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("csv_delimiter"));
}

#[test]
fn test_config_validation_rejects_zero_stats_log_interval() {
    let bad = VALID_CONFIG.replace("stats_log_interval_secs = 30", "stats_log_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stats_log_interval_secs"));
}

#[test]
fn test_config_validation_rejects_zero_stuck_after_ticks() {
    let bad = VALID_CONFIG.replace(
        "stats_log_interval_secs = 30",
        "stats_log_interval_secs = 30\nstuck_after_ticks = 0",
    );
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sampling.stuck_after_ticks"));
}

#[test]
fn test_config_validation_rejects_invalid_toml() {
    let err = AppConfig::load_from_str("not valid toml [[[").unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_config_load_from_file_via_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bwmon.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();
    unsafe { std::env::set_var("CONFIG_FILE", path.to_str().unwrap()) };
    let result = AppConfig::load();
    unsafe { std::env::remove_var("CONFIG_FILE") };
    let config = result.expect("load from CONFIG_FILE");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.output.mode, OutputMode::Csv);
}
