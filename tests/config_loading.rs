use std::io::Write;

use tempfile::NamedTempFile;

use packpipe::cli::{Command, CreateArgs};
use packpipe::config::{load_and_validate, load_from_path, ConfigFile};
use packpipe::errors::{PackpipeError, SETUP_FAILURE_EXIT_CODE};
use packpipe::types::CompressorKind;
use packpipe_test_utils::builders::ConfigFileBuilder;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str, needle: &str) {
    let file = config_file(contents);
    match load_and_validate(file.path()) {
        Err(err @ PackpipeError::ConfigError(_)) => {
            assert!(err.to_string().contains(needle), "{err} lacks {needle:?}");
            assert_eq!(err.exit_code(), SETUP_FAILURE_EXIT_CODE);
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn empty_file_yields_defaults() {
    let file = config_file("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.archive.engine, CompressorKind::SevenZip);
    assert_eq!(cfg.archive.level, 9);
    assert!(cfg.archive.preserve_acls);
    assert!(cfg.progress.enabled);
    assert!(cfg.progress.two_phase);
    assert_eq!(cfg.progress.spinner_interval_ms, 120);
    assert_eq!(cfg.cancel.grace_period_ms, 200);
    assert!(!cfg.output.remove_source);
}

#[test]
fn full_file_is_parsed() {
    let file = config_file(
        r#"
[archive]
engine = "xz"
level = 6
threads = 4
preserve_xattrs = false

[progress]
two_phase = false
si_units = true
spinner_interval_ms = 50

[cancel]
grace_period_ms = 500
reap_timeout_ms = 1000

[output]
remove_source = true
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.archive.engine, CompressorKind::Xz);
    assert_eq!(cfg.archive.level, 6);
    assert_eq!(cfg.archive.threads, 4);
    assert!(!cfg.archive.preserve_xattrs);
    assert!(!cfg.progress.two_phase);
    assert!(cfg.progress.si_units);
    assert_eq!(cfg.progress.poll_interval().as_millis(), 50);

    let cancel = cfg.cancel.options();
    assert_eq!(cancel.grace_period.as_millis(), 500);
    assert_eq!(cancel.reap_timeout.as_millis(), 1000);
    assert!(cfg.output.remove_source);
}

#[test]
fn level_above_nine_is_rejected() {
    expect_config_error("[archive]\nlevel = 10\n", "level");
}

#[test]
fn dictionary_requires_seven_zip() {
    expect_config_error(
        "[archive]\nengine = \"xz\"\ndictionary = \"64m\"\n",
        "only supported",
    );
}

#[test]
fn malformed_dictionary_is_rejected() {
    expect_config_error("[archive]\ndictionary = \"lots\"\n", "dictionary");
}

#[test]
fn zero_intervals_are_rejected() {
    expect_config_error("[progress]\nspinner_interval_ms = 0\n", "spinner_interval_ms");
    expect_config_error("[cancel]\ngrace_period_ms = 0\n", "grace_period_ms");
    expect_config_error("[cancel]\nreap_timeout_ms = 0\n", "reap_timeout_ms");
}

#[test]
fn unknown_engine_is_a_toml_error() {
    let file = config_file("[archive]\nengine = \"zstd\"\n");
    assert!(matches!(
        load_from_path(file.path()),
        Err(PackpipeError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_reported_with_its_path() {
    match load_from_path("/nonexistent/Packpipe.toml") {
        Err(PackpipeError::ConfigError(msg)) => assert!(msg.contains("/nonexistent/Packpipe.toml")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn valid_dictionary_sizes() {
    for dict in ["64m", "1G", "512k", "1048576", "4096b"] {
        let cfg = ConfigFileBuilder::new().dictionary(dict).raw();
        assert!(ConfigFile::try_from(cfg).is_ok(), "{dict}");
    }
}

#[test]
fn cli_flags_override_the_file() {
    let mut raw = ConfigFileBuilder::new().level(9).raw();
    let command = Command::Create(CreateArgs {
        source: "data".into(),
        output: None,
        engine: Some(CompressorKind::Xz),
        level: Some(3),
        threads: Some(2),
        no_progress: true,
        no_two_phase: true,
        remove_source: true,
    });

    packpipe::apply_overrides(&mut raw, &command);
    let cfg = ConfigFile::try_from(raw).unwrap();

    assert_eq!(cfg.archive.engine, CompressorKind::Xz);
    assert_eq!(cfg.archive.level, 3);
    assert_eq!(cfg.archive.threads, 2);
    assert!(!cfg.progress.enabled);
    assert!(!cfg.progress.two_phase);
    assert!(cfg.output.remove_source);
}

#[test]
fn cli_overrides_are_validated_too() {
    let mut raw = ConfigFileBuilder::new().raw();
    let command = Command::Create(CreateArgs {
        source: "data".into(),
        output: None,
        engine: None,
        level: Some(12),
        threads: None,
        no_progress: false,
        no_two_phase: false,
        remove_source: false,
    });

    packpipe::apply_overrides(&mut raw, &command);
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(PackpipeError::ConfigError(_))
    ));
}
