use tec_core::mocks::RecordingFactory;
use tec_core::routines::{square_wave, step_response};
use tec_core::{CancelToken, CyclerBuilder, TecError, ThermalCycler, TimeSeries};
use tec_traits::clock::Clock;
use tec_traits::clock::test_clock::TestClock;
use tec_traits::params::{OUTPUT_ENABLE, RAMP_RATE, TARGET_TEMPERATURE};

fn build(factory: &RecordingFactory) -> (ThermalCycler<RecordingFactory, TestClock>, TimeSeries) {
    let clock = TestClock::new();
    let series = TimeSeries::new(clock.now());
    let cycler = CyclerBuilder::new()
        .with_factory(factory.clone(), "mock")
        .with_cancel(CancelToken::new())
        .build_with_clock(clock)
        .unwrap();
    (cycler, series)
}

fn targets(factory: &RecordingFactory) -> Vec<f64> {
    factory
        .writes_of(TARGET_TEMPERATURE)
        .into_iter()
        .filter(|(_, instance)| *instance == 2)
        .map(|(v, _)| v)
        .collect()
}

#[test]
fn square_wave_alternates_high_and_low_per_ramp() {
    let factory = RecordingFactory::new();
    let (mut cycler, mut series) = build(&factory);

    let stats = square_wave(&mut cycler, 90.0, 50.0, &[10.0, 20.0], &mut series).unwrap();

    assert_eq!(targets(&factory), vec![90.0, 50.0, 90.0, 50.0]);
    let ramps: Vec<f64> = factory
        .writes_of(RAMP_RATE)
        .into_iter()
        .filter(|(_, i)| *i == 2)
        .map(|(v, _)| v)
        .collect();
    assert_eq!(ramps, vec![10.0, 10.0, 20.0, 20.0]);
    // dwell 14 s at 10 degC/s and 12 s at 20 degC/s, two edges each
    assert_eq!(stats.ticks, 2 * 28 + 2 * 24);
    assert_eq!(series.len() as u64, stats.ticks);
    assert_eq!(
        factory.writes_of(OUTPUT_ENABLE),
        vec![(1.0, 2), (1.0, 1), (0.0, 2), (0.0, 1)]
    );
    assert!(!cycler.is_enabled());
}

#[test]
fn step_response_returns_to_base_after_each_target() {
    let factory = RecordingFactory::new();
    let (mut cycler, mut series) = build(&factory);

    let stats = step_response(&mut cycler, 50.0, &[60.0, 70.0], &mut series).unwrap();

    assert_eq!(targets(&factory), vec![60.0, 50.0, 70.0, 50.0]);
    assert!(
        factory
            .writes_of(RAMP_RATE)
            .iter()
            .all(|(v, _)| *v == 20.0)
    );
    assert_eq!(stats.ticks, 4 * 40);
}

#[test]
fn routine_failure_still_disables_output() {
    // enable (0, 1), first edge (2..=5), second edge fails at its first write
    let factory = RecordingFactory::new().fail_write_at(6, "frame error");
    let (mut cycler, mut series) = build(&factory);

    let err = square_wave(&mut cycler, 90.0, 50.0, &[10.0], &mut series).unwrap_err();

    assert_eq!(err, TecError::Device("frame error".into()));
    assert_eq!(series.len(), 28);
    assert_eq!(
        factory.writes_of(OUTPUT_ENABLE),
        vec![(1.0, 2), (1.0, 1), (0.0, 2), (0.0, 1)]
    );
}

#[test]
fn bad_ramp_is_rejected_before_any_io() {
    let factory = RecordingFactory::new();
    let (mut cycler, mut series) = build(&factory);

    let err = square_wave(&mut cycler, 90.0, 50.0, &[0.0], &mut series).unwrap_err();

    assert!(matches!(err, TecError::Config(_)), "{err:?}");
    assert!(factory.calls().is_empty());
    assert!(!cycler.is_enabled());
}
