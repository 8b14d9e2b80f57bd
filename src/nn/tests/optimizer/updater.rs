use approx::assert_abs_diff_eq;

use crate::assert_err;
use crate::errors::{Operator, TensorError};
use crate::nn::optimizer::{
    MomentumUpdate, NesterovMomentumUpdate, ParameterUpdater, ScheduleValues, SimpleSgdUpdate,
    UpdateRule,
};
use crate::nn::{ParamId, Parameter};
use crate::tensor::Matrix;

fn parameter(values: &[f64]) -> Parameter<f64> {
    Parameter::new(
        ParamId::new(0),
        "w",
        Matrix::new(values, 1, values.len()).unwrap(),
    )
}

fn values(learning_rate: f64, momentum: f64) -> ScheduleValues {
    ScheduleValues {
        learning_rate,
        momentum,
    }
}

#[test]
fn test_simple_update() {
    let mut updater = SimpleSgdUpdate;
    let mut p = parameter(&[1.0, -2.0, 0.5]);
    let g = Matrix::new(&[0.5, 1.0, -1.0], 1, 3).unwrap();
    updater.apply(&mut p, &g, values(0.1, 0.9)).unwrap();

    let expected = Matrix::new(&[0.95, -2.1, 0.6], 1, 3).unwrap();
    crate::assert_matrix_eq!(p.value, expected, 1e-12);
    assert!(ParameterUpdater::<f64>::velocity(&updater, p.id()).is_none());
    // 梯度保持不变
    assert_eq!(g, Matrix::new(&[0.5, 1.0, -1.0], 1, 3).unwrap());
}

#[test]
fn test_momentum_update() {
    let mut updater = MomentumUpdate::new();
    let mut p = parameter(&[1.0, 2.0]);
    let g = Matrix::new(&[1.0, -1.0], 1, 2).unwrap();

    // v1 = -0.1·g，θ1 = θ0 + v1
    updater.apply(&mut p, &g, values(0.1, 0.5)).unwrap();
    assert_abs_diff_eq!(p.value[[0, 0]], 0.9, epsilon = 1e-12);
    assert_abs_diff_eq!(p.value[[0, 1]], 2.1, epsilon = 1e-12);

    // v2 = 0.5·v1 − 0.1·g = -0.15·g
    updater.apply(&mut p, &g, values(0.1, 0.5)).unwrap();
    assert_abs_diff_eq!(p.value[[0, 0]], 0.75, epsilon = 1e-12);
    assert_abs_diff_eq!(p.value[[0, 1]], 2.25, epsilon = 1e-12);

    let velocity = updater.velocity(p.id()).unwrap();
    assert_abs_diff_eq!(velocity[[0, 0]], -0.15, epsilon = 1e-12);
    assert_abs_diff_eq!(velocity[[0, 1]], 0.15, epsilon = 1e-12);
}

#[test]
fn test_nesterov_update() {
    let mut updater = NesterovMomentumUpdate::new();
    let mut p = parameter(&[1.0]);
    let g = Matrix::new(&[1.0], 1, 1).unwrap();

    // v1 = -0.1，θ1 = 1 − 0.9·0 + 1.9·(-0.1) = 0.81
    updater.apply(&mut p, &g, values(0.1, 0.9)).unwrap();
    assert_abs_diff_eq!(p.value[[0, 0]], 0.81, epsilon = 1e-12);

    // v2 = 0.9·(-0.1) − 0.1 = -0.19，θ2 = 0.81 + 0.09 + 1.9·(-0.19) = 0.539
    updater.apply(&mut p, &g, values(0.1, 0.9)).unwrap();
    assert_abs_diff_eq!(p.value[[0, 0]], 0.539, epsilon = 1e-12);
    assert_abs_diff_eq!(updater.velocity(p.id()).unwrap()[[0, 0]], -0.19, epsilon = 1e-12);
}

#[test]
fn test_zero_momentum_matches_simple() {
    let g = Matrix::new(&[0.3, -0.7, 1.1, 0.2], 2, 2).unwrap();
    let initial = Matrix::new(&[1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
    let mut reference = Parameter::new(ParamId::new(0), "w", initial.clone());
    let mut simple = SimpleSgdUpdate;
    for _ in 0..3 {
        simple.apply(&mut reference, &g, values(0.2, 0.0)).unwrap();
    }

    for rule in [UpdateRule::Momentum, UpdateRule::Nesterov] {
        let mut updater = rule.build::<f64>();
        let mut p = Parameter::new(ParamId::new(0), "w", initial.clone());
        for _ in 0..3 {
            updater.apply(&mut p, &g, values(0.2, 0.0)).unwrap();
        }
        crate::assert_matrix_eq!(p.value, reference.value, 1e-12);
    }
}

#[test]
fn test_velocities_are_per_parameter() {
    let mut updater = MomentumUpdate::new();
    let mut a = Parameter::new(ParamId::new(0), "a", Matrix::<f32>::zeros(2, 3));
    let mut b = Parameter::new(ParamId::new(1), "b", Matrix::<f32>::zeros(4, 1));
    updater
        .apply(&mut a, &Matrix::ones(2, 3), values(1.0, 0.9))
        .unwrap();
    updater
        .apply(&mut b, &Matrix::ones(4, 1), values(1.0, 0.9))
        .unwrap();

    assert_eq!(updater.velocity(a.id()).unwrap().shape(), (2, 3));
    assert_eq!(updater.velocity(b.id()).unwrap().shape(), (4, 1));
    assert!(updater.velocity(ParamId::new(2)).is_none());

    updater.reset();
    assert!(updater.velocity(a.id()).is_none());
}

#[test]
fn test_gradient_shape_mismatch() {
    for rule in [UpdateRule::Simple, UpdateRule::Momentum, UpdateRule::Nesterov] {
        let mut updater = rule.build::<f64>();
        let mut p = parameter(&[1.0, 2.0]);
        let g = Matrix::new(&[1.0, 2.0, 3.0], 1, 3).unwrap();
        assert_err!(
            updater.apply(&mut p, &g, values(0.1, 0.9)),
            TensorError::ShapeMismatch(Operator::ParameterUpdate, [1, 2], [1, 3])
        );
        // 失败的更新不修改参数
        assert_eq!(p.value, Matrix::new(&[1.0, 2.0], 1, 2).unwrap());
    }
}

#[test]
fn test_velocity_shape_must_not_change() {
    let mut updater = NesterovMomentumUpdate::new();
    let mut p = Parameter::new(ParamId::new(0), "w", Matrix::<f64>::zeros(2, 2));
    updater
        .apply(&mut p, &Matrix::ones(2, 2), values(0.1, 0.5))
        .unwrap();

    let mut reshaped = Parameter::new(ParamId::new(0), "w", Matrix::<f64>::zeros(3, 2));
    assert_err!(
        updater.apply(&mut reshaped, &Matrix::ones(3, 2), values(0.1, 0.5)),
        TensorError::ShapeMismatch(Operator::ParameterUpdate, [3, 2], [2, 2])
    );
}

#[test]
fn test_update_rule_names() {
    assert_eq!(UpdateRule::Simple.build::<f32>().name(), "sgd");
    assert_eq!(UpdateRule::Momentum.build::<f32>().name(), "momentum");
    assert_eq!(UpdateRule::Nesterov.build::<f32>().name(), "nesterov");
    assert_eq!(UpdateRule::default(), UpdateRule::Simple);
    assert_eq!(
        serde_json::from_str::<UpdateRule>("\"nesterov\"").unwrap(),
        UpdateRule::Nesterov
    );
}
