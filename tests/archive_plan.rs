use std::ffi::OsString;
use std::path::{Path, PathBuf};

use packpipe::archive::plan::{default_destination, render, FIFO_NAME};
use packpipe::archive::{
    backend_for, backend_for_archive, plan_create, plan_extract, ArchiveBackend, CreatePlan,
    CreateRequest, SevenZipBackend, XzBackend,
};
use packpipe::config::ConfigFile;
use packpipe::stage::{StdinSource, StdoutSink};
use packpipe::types::{CompressorKind, Engine};
use packpipe_test_utils::builders::ConfigFileBuilder;

fn argv(words: &[OsString]) -> Vec<String> {
    words.iter().map(|w| w.to_string_lossy().into_owned()).collect()
}

fn request<'a>(cfg: &'a ConfigFile, source: &'a Path, dest: &'a Path) -> CreateRequest<'a> {
    CreateRequest {
        source,
        dest,
        total_bytes: 1234,
        archive: &cfg.archive,
        progress: &cfg.progress,
    }
}

#[test]
fn seven_zip_create_command_line() {
    let backend = SevenZipBackend {
        level: 7,
        threads: 0,
        dictionary: Some("64m".to_string()),
    };
    let stage = backend.create_stage(Path::new("/out/data.tar.7z"));

    assert_eq!(stage.engine(), Engine::SevenZip);
    assert_eq!(
        argv(stage.argv()),
        ["7z", "a", "-si", "-t7z", "-mx=7", "-md=64m", "-mmt=on", "-bso0", "-bsp0", "/out/data.tar.7z"]
    );
    assert_eq!(*stage.stdin_source(), StdinSource::Pipe);
    assert_eq!(*stage.stdout_sink(), StdoutSink::Discard);

    let threaded = SevenZipBackend {
        level: 9,
        threads: 4,
        dictionary: None,
    };
    assert!(argv(threaded.create_stage(Path::new("x")).argv()).contains(&"-mmt=4".to_string()));
}

#[test]
fn xz_create_writes_the_archive_through_stdout() {
    let backend = XzBackend { level: 6, threads: 0 };
    let dest = PathBuf::from("/out/data.tar.xz");
    let stage = backend.create_stage(&dest);

    assert_eq!(argv(stage.argv()), ["xz", "-z", "-c", "-6", "-T0"]);
    assert_eq!(*stage.stdout_sink(), StdoutSink::File(dest));
    assert_eq!(backend.extension(), "xz");
}

#[test]
fn extract_list_and_test_commands() {
    let archive = Path::new("a.tar.7z");
    let seven = SevenZipBackend {
        level: 9,
        threads: 0,
        dictionary: None,
    };
    assert_eq!(argv(seven.extract_stage(archive).argv()), ["7z", "x", "-so", "a.tar.7z"]);
    assert_eq!(argv(seven.list_stage(archive).argv()), ["7z", "l", "a.tar.7z"]);
    assert_eq!(argv(seven.test_stage(archive).argv()), ["7z", "t", "a.tar.7z"]);

    let archive = Path::new("a.tar.xz");
    let xz = XzBackend { level: 9, threads: 0 };
    assert_eq!(argv(xz.extract_stage(archive).argv()), ["xz", "-d", "-c", "a.tar.xz"]);
    assert_eq!(argv(xz.list_stage(archive).argv()), ["xz", "-l", "a.tar.xz"]);
    assert_eq!(argv(xz.test_stage(archive).argv()), ["xz", "-t", "a.tar.xz"]);
}

#[test]
fn default_destination_appends_tar_and_extension() {
    let cfg = ConfigFileBuilder::new().build();
    let backend = backend_for(&cfg.archive);
    assert_eq!(
        default_destination(Path::new("/srv/photos"), backend.as_ref()).unwrap(),
        PathBuf::from("/srv/photos.tar.7z")
    );

    let cfg = ConfigFileBuilder::new().engine(CompressorKind::Xz).build();
    let backend = backend_for(&cfg.archive);
    assert_eq!(
        default_destination(Path::new("notes.txt"), backend.as_ref()).unwrap(),
        PathBuf::from("notes.txt.tar.xz")
    );
}

#[test]
fn archive_backend_follows_the_file_extension() {
    let cfg = ConfigFileBuilder::new().build();
    assert_eq!(backend_for_archive(Path::new("x.tar.xz"), &cfg.archive).kind(), CompressorKind::Xz);
    assert_eq!(backend_for_archive(Path::new("x.tar.7z"), &cfg.archive).kind(), CompressorKind::SevenZip);
    assert_eq!(backend_for_archive(Path::new("x.bin"), &cfg.archive).kind(), CompressorKind::SevenZip);
}

#[test]
fn create_without_progress_is_tar_into_compressor() {
    let cfg = ConfigFileBuilder::new().progress(false).portable_tar().build();
    let backend = backend_for(&cfg.archive);
    let source = Path::new("/srv/photos");
    let dest = Path::new("/srv/photos.tar.7z");

    let plan = plan_create(&request(&cfg, source, dest), backend.as_ref(), None).unwrap();
    let CreatePlan::Direct(spec) = &plan else {
        panic!("expected a direct plan, got {plan:?}");
    };
    assert_eq!(spec.len(), 2);
    assert_eq!(
        argv(spec.stages()[0].argv()),
        ["tar", "-C", "/srv", "-c", "-f", "-", "photos"]
    );
    assert_eq!(spec.stages()[1].engine(), Engine::SevenZip);
}

#[test]
fn create_with_progress_inserts_a_sized_meter() {
    let cfg = ConfigFileBuilder::new().two_phase(false).build();
    let backend = backend_for(&cfg.archive);

    let plan = plan_create(
        &request(&cfg, Path::new("data"), Path::new("data.tar.7z")),
        backend.as_ref(),
        Some(Path::new("/tmp/scratch")),
    )
    .unwrap();

    let CreatePlan::Direct(spec) = &plan else {
        panic!("two_phase = false must give a direct plan");
    };
    let engines: Vec<Engine> = spec.stages().iter().map(|s| s.engine()).collect();
    assert_eq!(engines, [Engine::Tar, Engine::Pv, Engine::SevenZip]);

    let tar = argv(spec.stages()[0].argv());
    assert!(tar.starts_with(&["tar".to_string(), "--acls".to_string(), "--xattrs".to_string()]));
    assert_eq!(
        argv(spec.stages()[1].argv()),
        ["pv", "-s", "1234", "-N", "packing", "-q"]
    );
}

#[test]
fn two_phase_plan_shares_one_fifo() {
    let cfg = ConfigFileBuilder::new().engine(CompressorKind::Xz).build();
    let backend = backend_for(&cfg.archive);
    let scratch = Path::new("/tmp/packpipe-test");

    let plan = plan_create(
        &request(&cfg, Path::new("data"), Path::new("data.tar.xz")),
        backend.as_ref(),
        Some(scratch),
    )
    .unwrap();

    assert!(plan.is_two_phase());
    let fifo = scratch.join(FIFO_NAME);
    assert_eq!(plan.fifo(), Some(fifo.as_path()));

    let CreatePlan::TwoPhase { meter, compress, .. } = &plan else {
        unreachable!();
    };
    assert_eq!(meter.stdout_fifo(), Some(fifo.as_path()));
    assert_eq!(compress.stdin_fifo(), Some(fifo.as_path()));

    let shown = plan.to_string();
    assert!(shown.starts_with("mkfifo /tmp/packpipe-test/stream.fifo"));
    assert!(shown.contains("xz -z -c -9 -T0 < /tmp/packpipe-test/stream.fifo > data.tar.xz &"));
}

#[test]
fn extract_plan_meters_without_a_total() {
    let cfg = ConfigFileBuilder::new().portable_tar().build();
    let backend = backend_for_archive(Path::new("a.tar.xz"), &cfg.archive);
    let spec = plan_extract(
        Path::new("a.tar.xz"),
        Path::new("out"),
        backend.as_ref(),
        &cfg.archive,
        &cfg.progress,
    )
    .unwrap();

    assert_eq!(
        render(spec.stages()),
        "xz -d -c a.tar.xz | pv -N unpacking -q | tar -C out -x -f -"
    );
}

#[test]
fn sources_without_a_file_name_are_rejected() {
    let cfg = ConfigFileBuilder::new().build();
    let backend = backend_for(&cfg.archive);
    assert!(plan_create(
        &request(&cfg, Path::new("/"), Path::new("root.tar.7z")),
        backend.as_ref(),
        None
    )
    .is_err());
}
