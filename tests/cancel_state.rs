use packpipe::cancel::{CancelEvent, CancelState};

const STATES: [CancelState; 5] = [
    CancelState::Idle,
    CancelState::Running,
    CancelState::CancelRequested,
    CancelState::TearingDown,
    CancelState::Done,
];

const EVENTS: [CancelEvent; 4] = [
    CancelEvent::Start,
    CancelEvent::Interrupt,
    CancelEvent::BeginTeardown,
    CancelEvent::Finish,
];

#[test]
fn normal_run_goes_idle_running_done() {
    let running = CancelState::Idle.on(CancelEvent::Start).unwrap();
    assert_eq!(running, CancelState::Running);
    assert_eq!(running.on(CancelEvent::Finish), Some(CancelState::Done));
}

#[test]
fn interrupted_run_tears_down_once() {
    let requested = CancelState::Running.on(CancelEvent::Interrupt).unwrap();
    assert_eq!(requested, CancelState::CancelRequested);
    assert!(requested.is_cancelling());

    // A second interrupt is rejected in every later state.
    assert_eq!(requested.on(CancelEvent::Interrupt), None);

    let tearing_down = requested.on(CancelEvent::BeginTeardown).unwrap();
    assert_eq!(tearing_down.on(CancelEvent::Interrupt), None);
    assert_eq!(tearing_down.on(CancelEvent::Finish), Some(CancelState::Done));
    assert_eq!(CancelState::Done.on(CancelEvent::Interrupt), None);
}

#[test]
fn interrupt_before_start_is_allowed() {
    assert_eq!(
        CancelState::Idle.on(CancelEvent::Interrupt),
        Some(CancelState::CancelRequested)
    );
    assert_eq!(CancelState::CancelRequested.on(CancelEvent::Start), None);
}

#[test]
fn done_is_terminal() {
    for event in EVENTS {
        assert_eq!(CancelState::Done.on(event), None, "{event:?}");
    }
}

#[test]
fn exactly_six_transitions_are_allowed() {
    let allowed = STATES
        .iter()
        .flat_map(|s| EVENTS.iter().map(move |e| s.on(*e)))
        .filter(Option::is_some)
        .count();
    assert_eq!(allowed, 6);
}
