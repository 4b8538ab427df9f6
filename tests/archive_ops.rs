use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use packpipe::archive::{create_archive, extract_archive, list_archive, test_archive, OpContext};
use packpipe::cancel::CancellationController;
use packpipe::config::ConfigFile;
use packpipe::errors::{PackpipeError, STAGE_FAILURE_EXIT_CODE};
use packpipe::fs::RealFileSystem;
use packpipe::types::CompressorKind;
use packpipe_test_utils::builders::ConfigFileBuilder;
use packpipe_test_utils::{init_tracing, require_tools, with_timeout};

fn xz_config() -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .engine(CompressorKind::Xz)
        .level(1)
        .portable_tar()
}

fn make_tree(root: &Path) {
    fs::create_dir_all(root.join("docs/nested")).unwrap();
    fs::write(root.join("readme.txt"), "hello packpipe\n").unwrap();
    fs::write(root.join("docs/a.txt"), "a".repeat(10_000)).unwrap();
    fs::write(root.join("docs/nested/b.txt"), "b".repeat(2_000)).unwrap();
    set_mode(&root.join("readme.txt"), 0o751);
    set_mode(&root.join("docs/nested/b.txt"), 0o600);
}

fn set_mode(path: &Path, mode: u32) {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Relative path -> (is_dir, size, permission bits) for everything below `root`.
fn listing(root: &Path) -> BTreeMap<PathBuf, (bool, u64, u32)> {
    let mut out = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let meta = fs::symlink_metadata(&path).unwrap();
            let size = if meta.is_dir() { 0 } else { meta.len() };
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            out.insert(rel, (meta.is_dir(), size, meta.permissions().mode() & 0o777));
            if meta.is_dir() {
                pending.push(path);
            }
        }
    }
    out
}

fn assert_same_tree(original: &Path, restored: &Path) {
    let expected = listing(original);
    assert_eq!(expected.len(), 5);
    assert_eq!(listing(restored), expected);

    assert_eq!(expected[Path::new("readme.txt")].2, 0o751);
    assert_eq!(expected[Path::new("docs/nested/b.txt")].2, 0o600);
    for rel in ["readme.txt", "docs/a.txt", "docs/nested/b.txt"] {
        assert_eq!(
            fs::read(original.join(rel)).unwrap(),
            fs::read(restored.join(rel)).unwrap(),
            "{rel} differs"
        );
    }
}

async fn create(
    cfg: &ConfigFile,
    source: &Path,
    dest: Option<&Path>,
) -> Result<packpipe::archive::CreateSummary, PackpipeError> {
    let controller = CancellationController::new(cfg.cancel.options());
    let ctx = OpContext {
        config: cfg,
        fs: &RealFileSystem,
        controller: &controller,
    };
    with_timeout(create_archive(ctx, source, dest)).await
}

#[tokio::test]
async fn existing_destination_is_never_overwritten() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data");
    make_tree(&source);
    let dest = dir.path().join("data.tar.xz");
    fs::write(&dest, "precious").unwrap();

    let cfg = xz_config().build();
    let result = create(&cfg, &source, None).await;

    assert!(matches!(result, Err(PackpipeError::Resource { .. })));
    assert_eq!(fs::read_to_string(&dest).unwrap(), "precious");
}

#[tokio::test]
async fn missing_source_is_rejected_before_spawning() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = xz_config().build();

    let result = create(&cfg, &dir.path().join("nope"), None).await;
    assert!(matches!(result, Err(PackpipeError::Resource { .. })));
}

#[tokio::test]
async fn xz_round_trip_without_progress() {
    init_tracing();
    require_tools!("tar", "xz");

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data");
    make_tree(&source);
    let cfg = xz_config().progress(false).build();

    let summary = create(&cfg, &source, None).await.unwrap();

    assert_eq!(summary.dest, dir.path().join("data.tar.xz"));
    assert_eq!(summary.source_bytes, 15 + 10_000 + 2_000);
    assert!(summary.archive_bytes > 0);
    assert!(summary.ratio().unwrap() < 1.0);
    assert!(!summary.source_removed);
    assert_eq!(summary.report.len(), 2);

    let restored = dir.path().join("restored");
    let controller = CancellationController::new(cfg.cancel.options());
    let ctx = OpContext {
        config: &cfg,
        fs: &RealFileSystem,
        controller: &controller,
    };
    let report = with_timeout(extract_archive(ctx, &summary.dest, &restored))
        .await
        .unwrap();
    assert!(report.outcome().is_success());
    assert_same_tree(&source, &restored.join("data"));
}

#[tokio::test]
async fn two_phase_round_trip_with_meter() {
    init_tracing();
    require_tools!("tar", "xz", "pv");

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data");
    make_tree(&source);
    let dest = dir.path().join("custom.tar.xz");
    let cfg = xz_config().spinner_interval_ms(20).build();

    let summary = create(&cfg, &source, Some(&dest)).await.unwrap();

    assert_eq!(summary.dest, dest);
    assert_eq!(summary.report.len(), 3);
    assert!(summary.report.outcome().is_success());

    let restored = dir.path().join("restored");
    let controller = CancellationController::new(cfg.cancel.options());
    let ctx = OpContext {
        config: &cfg,
        fs: &RealFileSystem,
        controller: &controller,
    };
    with_timeout(extract_archive(ctx, &dest, &restored)).await.unwrap();
    assert_same_tree(&source, &restored.join("data"));
}

#[tokio::test]
async fn remove_source_deletes_only_after_success() {
    init_tracing();
    require_tools!("tar", "xz");

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data");
    make_tree(&source);
    let cfg = xz_config().progress(false).remove_source(true).build();

    let summary = create(&cfg, &source, None).await.unwrap();

    assert!(summary.source_removed);
    assert!(!source.exists());
    assert!(summary.dest.exists());
}

#[tokio::test]
async fn list_and_test_a_good_archive() {
    init_tracing();
    require_tools!("tar", "xz");

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("data");
    make_tree(&source);
    let cfg = xz_config().progress(false).build();
    let summary = create(&cfg, &source, None).await.unwrap();

    for op in ["list", "test"] {
        let controller = CancellationController::new(cfg.cancel.options());
        let ctx = OpContext {
            config: &cfg,
            fs: &RealFileSystem,
            controller: &controller,
        };
        let report = match op {
            "list" => with_timeout(list_archive(ctx, &summary.dest)).await,
            _ => with_timeout(test_archive(ctx, &summary.dest)).await,
        }
        .unwrap();
        assert_eq!(report.codes(), vec![0], "{op}");
    }
}

#[tokio::test]
async fn corrupt_archive_fails_the_test_with_stage_failure() {
    init_tracing();
    require_tools!("xz");

    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.tar.xz");
    fs::write(&bogus, "this is not xz data").unwrap();

    let cfg = xz_config().build();
    let controller = CancellationController::new(cfg.cancel.options());
    let ctx = OpContext {
        config: &cfg,
        fs: &RealFileSystem,
        controller: &controller,
    };

    match with_timeout(test_archive(ctx, &bogus)).await {
        Err(err @ PackpipeError::StageFailure { failed: 1, total: 1 }) => {
            assert_eq!(err.exit_code(), STAGE_FAILURE_EXIT_CODE)
        }
        other => panic!("Expected StageFailure, got: {:?}", other.map(|r| r.codes())),
    }
}

#[tokio::test]
async fn failed_extract_reports_every_failing_stage() {
    init_tracing();
    require_tools!("tar", "xz");

    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.tar.xz");
    fs::write(&bogus, "garbage").unwrap();
    let cfg = xz_config().progress(false).build();
    let controller = CancellationController::new(cfg.cancel.options());
    let ctx = OpContext {
        config: &cfg,
        fs: &RealFileSystem,
        controller: &controller,
    };

    let result = with_timeout(extract_archive(ctx, &bogus, &dir.path().join("out"))).await;
    match result {
        Err(PackpipeError::StageFailure { failed, total }) => {
            assert_eq!(total, 2);
            assert!(failed >= 1);
        }
        other => panic!("Expected StageFailure, got: {:?}", other.map(|r| r.codes())),
    }
}
