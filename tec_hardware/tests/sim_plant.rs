use rstest::rstest;
use std::time::Duration;

use tec_hardware::error::HwError;
use tec_hardware::{SIM_ADDRESS, SIM_PORT, SimFactory};
use tec_traits::clock::Clock;
use tec_traits::clock::test_clock::TestClock;
use tec_traits::params::{
    LOOP_STATUS, OBJECT_TEMPERATURE, OUTPUT_CURRENT, OUTPUT_ENABLE, RAMP_RATE, TARGET_TEMPERATURE,
};
use tec_traits::{DeviceSession, SessionFactory};

fn hw(e: &tec_traits::BoxError) -> &HwError {
    e.downcast_ref::<HwError>().expect("HwError")
}

#[test]
fn driven_channel_settles_on_target_and_reports_stable() {
    let clock = TestClock::new();
    let mut factory = SimFactory::new(clock.clone());
    let mut s = factory.open(SIM_PORT).unwrap();

    s.set_parameter(RAMP_RATE, 5.0, SIM_ADDRESS, 2).unwrap();
    s.set_parameter(TARGET_TEMPERATURE, 75.0, SIM_ADDRESS, 2).unwrap();
    s.set_parameter(OUTPUT_ENABLE, 1.0, SIM_ADDRESS, 2).unwrap();

    clock.sleep(Duration::from_secs(2));
    assert_eq!(s.get_parameter(LOOP_STATUS, SIM_ADDRESS, 2).unwrap(), 1.0);
    assert!(s.get_parameter(OUTPUT_CURRENT, SIM_ADDRESS, 2).unwrap() > 0.0);

    // 50 degC at 5 degC/s plus a few time constants
    clock.sleep(Duration::from_secs(20));
    let t = s.get_parameter(OBJECT_TEMPERATURE, SIM_ADDRESS, 2).unwrap();
    assert!((t - 75.0).abs() < 0.5, "{t}");
    assert_eq!(s.get_parameter(LOOP_STATUS, SIM_ADDRESS, 2).unwrap(), 2.0);
    // Instance 1 was never enabled
    assert_eq!(s.get_parameter(LOOP_STATUS, SIM_ADDRESS, 1).unwrap(), 0.0);
}

#[test]
fn disabled_channel_relaxes_to_ambient() {
    let clock = TestClock::new();
    let mut factory = SimFactory::new(clock.clone());
    let sim = factory.handle();
    let mut s = factory.open(SIM_PORT).unwrap();

    s.set_parameter(TARGET_TEMPERATURE, 90.0, SIM_ADDRESS, 1).unwrap();
    s.set_parameter(OUTPUT_ENABLE, 1.0, SIM_ADDRESS, 1).unwrap();
    clock.sleep(Duration::from_secs(15));
    let hot = sim.object_temp(1).unwrap();
    assert!(hot > 85.0, "{hot}");

    s.set_parameter(OUTPUT_ENABLE, 0.0, SIM_ADDRESS, 1).unwrap();
    clock.sleep(Duration::from_secs(60));
    let cooled = s.get_parameter(OBJECT_TEMPERATURE, SIM_ADDRESS, 1).unwrap();
    assert!(cooled < hot - 30.0, "{hot} -> {cooled}");
    assert!(cooled > 25.0);
}

#[test]
fn reconnect_keeps_thermal_state() {
    let clock = TestClock::new();
    let mut factory = SimFactory::new(clock.clone());
    let sim = factory.handle();
    let mut s = factory.open(SIM_PORT).unwrap();
    s.set_parameter(TARGET_TEMPERATURE, 60.0, SIM_ADDRESS, 2).unwrap();
    drop(s);

    let mut again = factory.open(SIM_PORT).unwrap();
    assert_eq!(
        again.get_parameter(TARGET_TEMPERATURE, SIM_ADDRESS, 2).unwrap(),
        60.0
    );
    assert_eq!(sim.target(2), Some(60.0));
    assert_eq!(sim.writes(), 1);
}

#[test]
fn writes_are_rejected_after_the_configured_count() {
    let clock = TestClock::new();
    let mut factory = SimFactory::new(clock);
    let sim = factory.handle();
    sim.fail_after_writes(Some(2));
    let mut s = factory.open(SIM_PORT).unwrap();

    s.set_parameter(RAMP_RATE, 4.0, SIM_ADDRESS, 1).unwrap();
    s.set_parameter(RAMP_RATE, 4.0, SIM_ADDRESS, 2).unwrap();
    for _ in 0..2 {
        let err = s
            .set_parameter(TARGET_TEMPERATURE, 50.0, SIM_ADDRESS, 1)
            .unwrap_err();
        assert!(matches!(hw(&err), HwError::Nack(2)), "{err}");
    }
    // Reads are unaffected
    assert!(s.get_parameter(OBJECT_TEMPERATURE, SIM_ADDRESS, 1).is_ok());

    sim.fail_after_writes(None);
    s.set_parameter(TARGET_TEMPERATURE, 50.0, SIM_ADDRESS, 1).unwrap();
    assert_eq!(sim.writes(), 3);
}

#[rstest]
#[case(OBJECT_TEMPERATURE, SIM_ADDRESS, 3)]
#[case(OBJECT_TEMPERATURE, 7, 1)]
#[case(4242, SIM_ADDRESS, 1)]
fn bad_reads_are_typed(#[case] id: u16, #[case] address: u8, #[case] instance: u8) {
    let mut factory = SimFactory::new(TestClock::new());
    let mut s = factory.open(SIM_PORT).unwrap();
    let err = s.get_parameter(id, address, instance).unwrap_err();
    let expected = match (address, instance) {
        (SIM_ADDRESS, 3) => matches!(hw(&err), HwError::InvalidInstance(3)),
        (7, _) => matches!(hw(&err), HwError::AddressMismatch { got: 7, .. }),
        _ => matches!(hw(&err), HwError::UnknownParameter(4242)),
    };
    assert!(expected, "{err}");
}

#[test]
fn settle_for_advances_without_the_clock() {
    let clock = TestClock::new();
    let mut factory = SimFactory::new(clock.clone());
    let sim = factory.handle();
    let mut s = factory.open(SIM_PORT).unwrap();
    s.set_parameter(TARGET_TEMPERATURE, 40.0, SIM_ADDRESS, 1).unwrap();
    s.set_parameter(OUTPUT_ENABLE, 1.0, SIM_ADDRESS, 1).unwrap();

    sim.settle_for(Duration::from_secs(30));

    assert!((sim.object_temp(1).unwrap() - 40.0).abs() < 0.5);
    assert_eq!(clock.elapsed(), Duration::ZERO);
}
