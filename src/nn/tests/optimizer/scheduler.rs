use approx::assert_abs_diff_eq;

use crate::assert_err;
use crate::errors::{ComparisonOperator, ScheduleError};
use crate::nn::optimizer::{Constant, ExponentialDecay, LinearRampUp, Schedule, Scheduler};

#[test]
fn test_constant() {
    let schedule = Scheduler::constant(0.3);
    for step in [0, 1, 10, usize::MAX] {
        assert_eq!(schedule.value(step), 0.3);
    }
    assert_eq!(Scheduler::from(0.3), schedule);
    assert_eq!(Constant::new(-1.0).value(7), -1.0);
}

#[test]
fn test_exponential_decay() {
    let schedule = Scheduler::exponential_decay(0.1, 0.5).unwrap();
    assert_abs_diff_eq!(schedule.value(0), 0.1);
    assert_abs_diff_eq!(schedule.value(1), 0.05);
    assert_abs_diff_eq!(schedule.value(3), 0.0125);
    // 步数极大时下溢为0而不是panic
    assert_eq!(schedule.value(usize::MAX), 0.0);

    let flat = ExponentialDecay::new(0.2, 1.0).unwrap();
    assert_eq!(flat.value(1000), 0.2);
}

#[test]
fn test_exponential_decay_is_monotonic() {
    let schedule = Scheduler::exponential_decay(1.0, 0.99).unwrap();
    let values: Vec<f64> = (0..50).map(|s| schedule.value(s)).collect();
    assert!(values.windows(2).all(|w| w[1] < w[0]));
}

#[test]
fn test_linear_ramp_up() {
    let schedule = Scheduler::linear_ramp_up(0.5, 0.9, 4).unwrap();
    assert_abs_diff_eq!(schedule.value(0), 0.5);
    assert_abs_diff_eq!(schedule.value(1), 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(schedule.value(2), 0.7, epsilon = 1e-12);
    assert_abs_diff_eq!(schedule.value(4), 0.9, epsilon = 1e-12);
    assert_abs_diff_eq!(schedule.value(100), 0.9, epsilon = 1e-12);

    let down = LinearRampUp::new(1.0, 0.0, 2).unwrap();
    assert_abs_diff_eq!(down.value(1), 0.5);
    assert_abs_diff_eq!(down.value(5), 0.0);
}

#[test]
fn test_invalid_config() {
    assert_err!(
        Scheduler::exponential_decay(0.0, 0.5),
        ScheduleError::InvalidScheduleConfig { parameter, operator: ComparisonOperator::GreaterThan, .. }
            if *parameter == "initial"
    );
    assert_err!(
        Scheduler::exponential_decay(0.1, 0.0),
        ScheduleError::InvalidScheduleConfig { parameter, value, .. }
            if *parameter == "decay" && *value == 0.0
    );
    assert_err!(
        Scheduler::exponential_decay(0.1, 1.5),
        ScheduleError::InvalidScheduleConfig { operator: ComparisonOperator::LessOrEqual, threshold, .. }
            if *threshold == 1.0
    );
    assert_err!(
        Scheduler::exponential_decay(f64::NAN, 0.5),
        ScheduleError::InvalidScheduleConfig { .. }
    );
    assert_err!(
        Scheduler::linear_ramp_up(0.5, 0.9, 0),
        ScheduleError::InvalidScheduleConfig { parameter, .. } if *parameter == "horizon"
    );
}

#[test]
fn test_error_message() {
    let err = Scheduler::exponential_decay(0.1, 2.0).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("decay"), "{message}");
    assert!(message.contains('2'), "{message}");
}

#[test]
fn test_serde() {
    let schedule = Scheduler::linear_ramp_up(0.5, 0.9, 5).unwrap();
    let json = serde_json::to_string(&schedule).unwrap();
    assert!(json.contains("\"kind\":\"linear_ramp_up\""), "{json}");
    assert_eq!(serde_json::from_str::<Scheduler>(&json).unwrap(), schedule);

    let parsed: Scheduler =
        serde_json::from_str(r#"{"kind":"exponential_decay","initial":0.1,"decay":0.99}"#)
            .unwrap();
    assert_eq!(parsed, Scheduler::exponential_decay(0.1, 0.99).unwrap());

    let parsed: Scheduler = serde_json::from_str(r#"{"kind":"constant","value":2.0}"#).unwrap();
    assert_eq!(parsed.value(3), 2.0);
}

#[test]
fn test_deserialize_rejects_invalid_config() {
    assert!(
        serde_json::from_str::<Scheduler>(r#"{"kind":"exponential_decay","initial":0.1,"decay":1.5}"#)
            .is_err()
    );
    assert!(
        serde_json::from_str::<Scheduler>(r#"{"kind":"linear_ramp_up","start":0.0,"end":1.0,"horizon":0}"#)
            .is_err()
    );
    assert!(serde_json::from_str::<Scheduler>(r#"{"kind":"cosine"}"#).is_err());
}
