use rstest::rstest;
use tec_core::mocks::RecordingFactory;
use tec_core::{
    CalibrationModel, DeviceGateway, SetpointController, TecError, ZoneChannels, ZoneTuning,
};
use tec_traits::params::{RAMP_RATE, TARGET_TEMPERATURE};

fn unit3() -> CalibrationModel {
    CalibrationModel::new(
        ZoneTuning::new(0.5224, 0.8228).unwrap(),
        ZoneTuning::new(1.5425, 0.7747).unwrap(),
    )
}

fn connected() -> (DeviceGateway<RecordingFactory>, RecordingFactory) {
    let factory = RecordingFactory::new();
    let mut gw = DeviceGateway::new(factory.clone(), "mock");
    gw.connect().unwrap();
    (gw, factory)
}

#[test]
fn ramp_precedes_setpoint_bottom_then_top() {
    let (mut gw, factory) = connected();
    let ctl = SetpointController::new(unit3(), ZoneChannels::default());

    let applied = ctl.apply(&mut gw, 60.0, 4.0).unwrap();

    let bottom = 0.5224 + 0.8228 * 60.0;
    let top = 1.5425 + 0.7747 * 60.0;
    assert_eq!(
        factory.writes(),
        vec![
            (RAMP_RATE, 4.0, 2),
            (TARGET_TEMPERATURE, bottom, 2),
            (RAMP_RATE, 4.0, 1),
            (TARGET_TEMPERATURE, top, 1),
        ]
    );
    assert_eq!(applied.bottom, bottom);
    assert_eq!(applied.top, top);
    assert_eq!(applied.logical, 60.0);
}

#[test]
fn identity_calibration_writes_the_request_unchanged() {
    let (mut gw, factory) = connected();
    let ctl = SetpointController::new(CalibrationModel::default(), ZoneChannels::default());
    ctl.apply(&mut gw, 72.0, 2.5).unwrap();
    let targets: Vec<f64> = factory
        .writes_of(TARGET_TEMPERATURE)
        .into_iter()
        .map(|(v, _)| v)
        .collect();
    assert_eq!(targets, vec![72.0, 72.0]);
}

#[test]
fn multi_channel_zones_write_every_channel() {
    let (mut gw, factory) = connected();
    let channels = ZoneChannels {
        bottom: vec![2, 4],
        top: vec![1, 3],
    };
    let ctl = SetpointController::new(CalibrationModel::default(), channels);
    ctl.apply(&mut gw, 50.0, 1.0).unwrap();
    let instances: Vec<u8> = factory.writes().into_iter().map(|(_, _, i)| i).collect();
    assert_eq!(instances, vec![2, 4, 2, 4, 1, 3, 1, 3]);
}

#[rstest]
#[case(60.0, 0.0)]
#[case(60.0, -1.0)]
#[case(60.0, f64::NAN)]
#[case(f64::INFINITY, 4.0)]
fn invalid_inputs_are_rejected_before_any_write(#[case] temp: f64, #[case] ramp: f64) {
    let (mut gw, factory) = connected();
    let ctl = SetpointController::new(unit3(), ZoneChannels::default());
    let err = ctl.apply(&mut gw, temp, ramp).unwrap_err();
    assert!(matches!(err, TecError::Config(_)), "{err:?}");
    assert!(factory.writes().is_empty());
}

#[test]
fn failed_write_stops_the_sequence() {
    let factory = RecordingFactory::new().fail_write_at(2, "frame checksum mismatch");
    let mut gw = DeviceGateway::new(factory.clone(), "mock");
    gw.connect().unwrap();
    let ctl = SetpointController::new(CalibrationModel::default(), ZoneChannels::default());

    let err = ctl.apply(&mut gw, 60.0, 4.0).unwrap_err();

    assert_eq!(err, TecError::Device("frame checksum mismatch".into()));
    // Bottom zone went through; top zone never started
    assert_eq!(
        factory.writes(),
        vec![(RAMP_RATE, 4.0, 2), (TARGET_TEMPERATURE, 60.0, 2)]
    );
}

#[test]
fn apply_without_connection_is_not_connected() {
    let factory = RecordingFactory::new();
    let mut gw = DeviceGateway::new(factory.clone(), "mock");
    let ctl = SetpointController::new(CalibrationModel::default(), ZoneChannels::default());
    assert_eq!(
        ctl.apply(&mut gw, 60.0, 4.0).unwrap_err(),
        TecError::NotConnected
    );
    assert!(factory.calls().is_empty());
}
