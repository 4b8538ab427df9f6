use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::time::sleep;

use packpipe::cancel::{CancelHandle, CancelOptions, CancelState, CancellationController};
use packpipe::errors::{PackpipeError, CANCEL_EXIT_CODE};
use packpipe::pipeline::{Endpoints, PipelineSpec, PipelineSupervisor};
use packpipe::stage::StageRunner;
use packpipe::types::Engine;
use packpipe_test_utils::builders::{head, piped, tail};
use packpipe_test_utils::{init_tracing, with_timeout};

fn controller(grace_ms: u64) -> CancellationController {
    CancellationController::new(CancelOptions {
        grace_period: Duration::from_millis(grace_ms),
        reap_timeout: Duration::from_secs(2),
    })
}

fn cancel_after(handle: CancelHandle, delay: Duration) {
    tokio::spawn(async move {
        sleep(delay).await;
        handle.request();
    });
}

fn long_running() -> PipelineSpec {
    PipelineSpec::new(vec![
        head(Engine::Tar, "yes"),
        piped(Engine::Pv, "cat"),
        tail(Engine::Xz, "cat > /dev/null"),
    ])
    .unwrap()
}

#[test]
fn only_the_first_request_starts_a_cancellation() {
    let controller = CancellationController::default();
    let handle = controller.handle();

    assert!(handle.request());
    assert!(!handle.request());
    assert!(!controller.handle().request());
    assert_eq!(controller.state(), CancelState::CancelRequested);
}

#[tokio::test]
async fn cancel_mid_run_tears_everything_down() {
    init_tracing();
    let controller = controller(200);
    let registry = controller.registry();
    let supervisor = PipelineSupervisor::new(StageRunner::new(registry.clone()));
    let spec = long_running();

    let pids = std::sync::Mutex::new(Vec::new());
    cancel_after(controller.handle(), Duration::from_millis(150));

    let result = with_timeout(controller.run(async {
        let running = supervisor.start(&spec, Endpoints::default()).await?;
        pids.lock().unwrap().extend(running.pids());
        running.wait_all().await
    }))
    .await;

    match result {
        Err(err @ PackpipeError::Cancelled) => assert_eq!(err.exit_code(), CANCEL_EXIT_CODE),
        other => panic!("Expected Cancelled, got: {:?}", other.map(|r| r.codes())),
    }
    assert_eq!(controller.state(), CancelState::Done);
    assert!(registry.is_empty());

    let pids = pids.into_inner().unwrap();
    assert_eq!(pids.len(), 3);
    for pid in pids {
        assert_eq!(kill(Pid::from_raw(pid as i32), None), Err(Errno::ESRCH));
    }
}

#[tokio::test]
async fn back_to_back_requests_mid_run_tear_down_once() {
    init_tracing();
    let controller = controller(200);
    let registry = controller.registry();
    let scratch = controller.create_scratch_dir().unwrap();
    let partial = scratch.join("partial.tar.xz");
    fs::write(&partial, b"half").unwrap();
    controller.register_partial_output(&partial);

    let supervisor = PipelineSupervisor::new(StageRunner::new(registry.clone()));
    let spec = long_running();

    let handle = controller.handle();
    let requests = tokio::spawn(async move {
        sleep(Duration::from_millis(150)).await;
        (handle.request(), handle.request())
    });

    let result = with_timeout(controller.run(supervisor.run(&spec))).await;
    let (first, second) = requests.await.unwrap();

    assert!(first);
    assert!(!second, "the second request must not start another teardown");
    assert!(matches!(result, Err(PackpipeError::Cancelled)));
    assert_eq!(controller.state(), CancelState::Done);
    assert!(registry.is_empty());
    assert!(!partial.exists());
    assert!(!scratch.exists());
    assert!(controller.artifact_paths().is_empty());
    assert!(!controller.handle().request());
}

#[tokio::test]
async fn stages_ignoring_sigterm_are_killed_after_the_grace_period() {
    init_tracing();
    let controller = controller(100);
    let registry = controller.registry();
    let supervisor = PipelineSupervisor::new(StageRunner::new(registry.clone()));

    // SIG_IGN survives exec, so the sleeps ignore SIGTERM too.
    let spec = PipelineSpec::new(vec![
        head(Engine::Tar, "trap '' TERM; while :; do sleep 0.05; done"),
        tail(Engine::Xz, "trap '' TERM; cat > /dev/null"),
    ])
    .unwrap();

    cancel_after(controller.handle(), Duration::from_millis(100));
    let started = Instant::now();
    let result = with_timeout(controller.run(supervisor.run(&spec))).await;

    assert!(matches!(result, Err(PackpipeError::Cancelled)));
    assert!(registry.is_empty());
    // grace (100ms) + reap bound (2s), with slack for a loaded machine.
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn scratch_artifacts_are_removed_on_cancel() {
    init_tracing();
    let controller = controller(100);
    let scratch = controller.create_scratch_dir().unwrap();
    let fifo = controller.create_fifo(&scratch.join("stream.fifo")).unwrap();
    let partial = scratch.join("partial.tar.xz");
    fs::write(&partial, b"half an archive").unwrap();
    controller.register_partial_output(&partial);

    assert!(scratch.is_dir());
    assert!(fifo.exists());
    assert_eq!(controller.artifact_paths().len(), 3);

    let supervisor = PipelineSupervisor::new(StageRunner::new(controller.registry()));
    let spec = long_running();
    cancel_after(controller.handle(), Duration::from_millis(100));
    let result = with_timeout(controller.run(supervisor.run(&spec))).await;

    assert!(matches!(result, Err(PackpipeError::Cancelled)));
    assert!(!partial.exists());
    assert!(!fifo.exists());
    assert!(!scratch.exists());
    assert!(controller.artifact_paths().is_empty());
}

#[tokio::test]
async fn cancel_before_start_only_cleans_up() {
    init_tracing();
    let controller = controller(100);
    let scratch = controller.create_scratch_dir().unwrap();
    let polled = AtomicBool::new(false);

    controller.handle().request();
    let result = with_timeout(controller.run(async {
        polled.store(true, Ordering::SeqCst);
        Ok(())
    }))
    .await;

    assert!(matches!(result, Err(PackpipeError::Cancelled)));
    assert!(!polled.load(Ordering::SeqCst), "pipeline must not start");
    assert!(!scratch.exists());
    assert_eq!(controller.state(), CancelState::Done);
}

#[tokio::test]
async fn completed_run_keeps_only_released_outputs() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let kept = dir.path().join("kept.bin");
    let dropped = dir.path().join("dropped.bin");
    fs::write(&kept, b"k").unwrap();
    fs::write(&dropped, b"d").unwrap();

    let controller = controller(100);
    controller.register_partial_output(&kept);
    controller.register_partial_output(&dropped);

    let value = with_timeout(controller.run(async {
        assert!(controller.keep_output(&kept));
        Ok(7)
    }))
    .await
    .unwrap();

    assert_eq!(value, 7);
    assert!(kept.exists());
    assert!(!dropped.exists());
    assert_eq!(controller.state(), CancelState::Done);
    assert!(!controller.handle().request(), "cancel after completion is ignored");
}

#[tokio::test]
async fn pipeline_errors_pass_through_and_clean_up() {
    init_tracing();
    let controller = controller(100);
    let scratch = controller.create_scratch_dir().unwrap();

    let result: Result<(), _> = with_timeout(controller.run(async {
        Err(PackpipeError::InvalidPipeline("boom".to_string()))
    }))
    .await;

    assert!(matches!(result, Err(PackpipeError::InvalidPipeline(_))));
    assert!(!scratch.exists());
}
