use crate::*;
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;
use store::{Consistency, Depth, Direction, HostPort, Key, TimeUnit};
use tempfile::NamedTempFile;

fn base() -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    props.insert(KV_HOST_PORT.to_string(), "sn1:5000, sn2:5000".to_string());
    props.insert(KV_NAME.to_string(), "kvstore".to_string());
    props.insert(KV_MAJOR_KEYS_MAPPING.to_string(), "table,id".to_string());
    props
}

fn with(mut props: BTreeMap<String, String>, key: &str, value: &str) -> BTreeMap<String, String> {
    props.insert(key.to_string(), value.to_string());
    props
}

// -------------------- Column mapping --------------------

#[test]
fn default_minor_column_is_value() -> Result<()> {
    let columns = ColumnMapping::parse("table, id", None)?;
    assert_eq!(columns.major(), ["table", "id"]);
    assert_eq!(columns.minor(), [DEFAULT_VALUE_COLUMN]);
    assert_eq!(columns.field_count(), 3);
    assert_eq!(columns.column_names().collect::<Vec<_>>(), ["table", "id", "value"]);
    assert_eq!(columns.null_sentinel(), DEFAULT_NULL_SENTINEL);
    Ok(())
}

#[test]
fn column_mapping_rejects_blanks() {
    assert!(matches!(
        ColumnMapping::parse("", None),
        Err(ConfigError::MissingRequired(KV_MAJOR_KEYS_MAPPING))
    ));
    assert!(ColumnMapping::parse("a,,b", None).is_err());
    assert!(ColumnMapping::parse("a", Some("  ")).is_err());
    assert!(ColumnMapping::parse("a", Some("x, ")).is_err());
}

// -------------------- Job config --------------------

#[test]
fn minimal_properties_use_defaults() -> Result<()> {
    let job = JobConfig::from_properties(&base())?;
    assert_eq!(
        job.helper_hosts,
        vec![HostPort::new("sn1", 5000), HostPort::new("sn2", 5000)]
    );
    assert_eq!(job.store_name, "kvstore");
    assert_eq!(job.columns.minor(), ["value"]);
    assert_eq!(job.iteration, IterationParams::default());
    assert_eq!(job.ping_timeout, DEFAULT_PING_TIMEOUT);
    assert_eq!(job.iteration.scan_options().timeout, None);
    Ok(())
}

#[test]
fn missing_required_keys() {
    for key in [KV_HOST_PORT, KV_NAME, KV_MAJOR_KEYS_MAPPING] {
        let mut props = base();
        props.remove(key);
        match JobConfig::from_properties(&props) {
            Err(ConfigError::MissingRequired(k)) => assert_eq!(k, key),
            other => panic!("expected MissingRequired({}), got {:?}", key, other),
        }

        let blank = with(base(), key, "   ");
        assert!(matches!(
            JobConfig::from_properties(&blank),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}

#[test]
fn full_iteration_settings() -> Result<()> {
    let mut props = base();
    for (k, v) in [
        (KV_MINOR_KEYS_MAPPING, "attr"),
        (KV_NULL_SENTINEL, "\\N"),
        (KV_SCAN_DIRECTION, "REVERSE"),
        (KV_SCAN_BATCH_SIZE, "250"),
        (KV_SCAN_PARENT_KEY, "/user"),
        (KV_SCAN_SUBRANGE, "[a,m)"),
        (KV_SCAN_DEPTH, "CHILDREN_ONLY"),
        (KV_SCAN_CONSISTENCY, "TIME:100:2000"),
        (KV_SCAN_TIMEOUT, "3"),
        (KV_SCAN_TIMEOUT_UNIT, "SECONDS"),
        (KV_PING_TIMEOUT_MS, "750"),
    ] {
        props = with(props, k, v);
    }

    let job = JobConfig::from_properties(&props)?;
    let it = &job.iteration;
    assert_eq!(job.columns.minor(), ["attr"]);
    assert_eq!(job.columns.null_sentinel(), "\\N");
    assert_eq!(it.direction, Direction::Reverse);
    assert_eq!(it.batch_size, 250);
    assert_eq!(it.parent_key, Some(Key::parse("/user")?));
    assert!(it.sub_range.as_ref().map(|r| r.contains("b")).unwrap_or(false));
    assert_eq!(it.depth, Depth::ChildrenOnly);
    assert_eq!(
        it.consistency,
        Some(Consistency::Time {
            permissible_lag_ms: 100,
            timeout_ms: 2000
        })
    );
    assert_eq!(it.timeout_unit, Some(TimeUnit::Seconds));
    assert_eq!(job.ping_timeout, Duration::from_millis(750));

    let scan = it.scan_options();
    assert_eq!(scan.timeout, Some(Duration::from_secs(3)));
    assert_eq!(scan.batch_size, 250);
    Ok(())
}

#[test]
fn timeout_requires_unit() -> Result<()> {
    let props = with(base(), KV_SCAN_TIMEOUT, "10");
    assert!(matches!(
        JobConfig::from_properties(&props),
        Err(ConfigError::MissingRequired(KV_SCAN_TIMEOUT_UNIT))
    ));

    // zero timeout needs no unit
    let props = with(base(), KV_SCAN_TIMEOUT, "0");
    assert_eq!(JobConfig::from_properties(&props)?.iteration.timeout, 0);
    Ok(())
}

#[test]
fn unparsable_values_name_their_key() {
    let cases = [
        (KV_HOST_PORT, "sn1"),
        (KV_SCAN_DIRECTION, "SIDEWAYS"),
        (KV_SCAN_BATCH_SIZE, "-1"),
        (KV_SCAN_PARENT_KEY, "user"),
        (KV_SCAN_SUBRANGE, "a,b"),
        (KV_SCAN_DEPTH, "ALL"),
        (KV_SCAN_CONSISTENCY, "TIME:1"),
        (KV_SCAN_TIMEOUT_UNIT, "FORTNIGHTS"),
        (KV_PING_TIMEOUT_MS, "soon"),
    ];
    for (key, value) in cases {
        match JobConfig::from_properties(&with(base(), key, value)) {
            Err(ConfigError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
            other => panic!("{}={} should be invalid, got {:?}", key, value, other),
        }
    }
}

#[test]
fn timeout_duration_ignores_missing_unit() {
    let params = IterationParams {
        timeout: 5,
        ..IterationParams::default()
    };
    assert_eq!(params.timeout_duration(), None);
}

// -------------------- Properties files --------------------

#[test]
fn parse_properties_syntax() {
    let props = parse_properties(
        "# comment\n\
         ! also a comment\n\
         \n\
         kv.name = kvstore\n\
         kv.host.port: sn1:5000\n\
         flag\n\
         kv.name=second\n",
    );
    assert_eq!(props.get("kv.name").map(String::as_str), Some("second"));
    assert_eq!(props.get("kv.host.port").map(String::as_str), Some("sn1:5000"));
    assert_eq!(props.get("flag").map(String::as_str), Some(""));
    assert_eq!(props.len(), 3);
}

#[test]
fn load_properties_from_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "kv.host.port=sn1:5000")?;
    writeln!(file, "kv.name=kvstore")?;
    writeln!(file, "kv.major.keys.mapping=table")?;
    file.flush()?;

    let job = JobConfig::from_properties(&load_properties(file.path())?)?;
    assert_eq!(job.store_name, "kvstore");
    assert_eq!(job.columns.field_count(), 2);
    Ok(())
}

#[test]
fn load_properties_missing_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = load_properties(dir.path().join("absent.properties")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.properties"));
    Ok(())
}
