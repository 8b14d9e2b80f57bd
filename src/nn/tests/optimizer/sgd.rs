use approx::assert_abs_diff_eq;

use super::super::{one_hot, random_inputs};
use crate::assert_err;
use crate::data::{BatchDataProvider, DataError, MiniBatchDataProvider};
use crate::distribution::Sampler;
use crate::errors::{Operator, TensorError, TrainError};
use crate::nn::layer::TopKind;
use crate::nn::optimizer::{
    BoxedProvider, OptimizerState, Scheduler, Sgd, SgdConfig, StepUnit, UpdateRule,
};
use crate::nn::{Gradients, Mode, Model, NeuralNet, NeuralNetBuilder, ParamId, Parameter};
use crate::tensor::Matrix;

/// 关于0对称的16个点上的`y = slope · x + intercept`
fn line(slope: f64, intercept: f64) -> (Matrix<f64>, Matrix<f64>) {
    let xs: Vec<f64> = (0..16).map(|i| -1.0 + 2.0 * i as f64 / 15.0).collect();
    let ys: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
    (
        Matrix::new(&xs, 16, 1).unwrap(),
        Matrix::new(&ys, 16, 1).unwrap(),
    )
}

fn linear_model(seed: u64) -> NeuralNet<f64> {
    NeuralNetBuilder::new(1, 1)
        .top(TopKind::LinearRegression)
        .seed(seed)
        .build()
        .unwrap()
}

fn full_batch(x: Matrix<f64>, y: Matrix<f64>) -> BoxedProvider<f64> {
    Box::new(BatchDataProvider::new(x, y).unwrap())
}

#[test]
fn test_run_until_exhausted() {
    let (x, y) = line(2.0, 1.0);
    let mut sgd = Sgd::new(linear_model(1), full_batch(x, y), None, SgdConfig::new()).unwrap();
    assert_eq!(sgd.state(), OptimizerState::Idle);

    assert_eq!(sgd.run(5).unwrap(), OptimizerState::Exhausted);
    assert_eq!(sgd.state(), OptimizerState::Exhausted);
    assert_eq!(sgd.epoch(), 5);
    assert_eq!(sgd.step(), 5);
    assert_eq!(sgd.monitor().len(), 5);
    assert!(sgd.monitor().test_errors().is_empty());
    assert!(sgd.monitor().last_train_error() < sgd.monitor().first_train_error());

    // 终止状态不能再运行
    assert_err!(
        sgd.run(1),
        TrainError::AlreadyFinished(OptimizerState::Exhausted)
    );
    assert_eq!(sgd.epoch(), 5);
}

#[test]
fn test_converges_to_line() {
    let (x, y) = line(2.0, 1.0);
    let config = SgdConfig::new()
        .learning_rate(0.5)
        .convergence_tolerance(1e-14);
    let mut sgd = Sgd::new(linear_model(2), full_batch(x, y), None, config).unwrap();
    assert_eq!(sgd.run(5000).unwrap(), OptimizerState::Converged);
    assert!(sgd.epoch() < 5000);

    let top = sgd.model().top_layer();
    assert_abs_diff_eq!(top.bias().unwrap()[[0, 0]], 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(top.weights().unwrap()[[0, 0]], 2.0, epsilon = 1e-4);
}

#[test]
fn test_numeric_divergence() {
    let (x, y) = line(2.0, 1.0);
    let config = SgdConfig::new().learning_rate(1e6);
    let mut sgd = Sgd::new(linear_model(3), full_batch(x, y), None, config).unwrap();
    assert_err!(sgd.run(1000), TrainError::NumericDivergence { .. });
    // 出错时停留在Running，且不能当作已正常结束
    assert_eq!(sgd.state(), OptimizerState::Running);
}

#[test]
fn test_early_stopping_restores_best() {
    // 训练数据把斜率推向2，测试数据要求斜率为-2：测试误差逐epoch上升
    let (train_x, train_y) = line(2.0, 0.0);
    let (test_x, test_y) = line(-2.0, 0.0);
    let config = SgdConfig::new().learning_rate(0.5).early_stopping(2, 0.0);
    let mut sgd = Sgd::new(
        linear_model(4),
        full_batch(train_x, train_y),
        Some(full_batch(test_x.clone(), test_y.clone())),
        config,
    )
    .unwrap();

    assert_eq!(sgd.run(100).unwrap(), OptimizerState::EarlyStopped);
    assert_eq!(sgd.epoch(), 3);
    assert_eq!(sgd.best_epoch(), Some(0));

    let test_errors = sgd.monitor().test_errors();
    assert_eq!(test_errors.len(), 3);
    assert!(test_errors[1].value > test_errors[0].value);
    assert!(test_errors[2].value > test_errors[1].value);

    let restored = sgd
        .model()
        .test_error(&test_x, &test_y, &mut Sampler::new(0))
        .unwrap();
    assert_abs_diff_eq!(restored, test_errors[0].value, epsilon = 1e-12);
}

#[test]
fn test_early_stopping_requires_test_data() {
    let (x, y) = line(1.0, 0.0);
    let config = SgdConfig::new().early_stopping(3, 0.0);
    let result = Sgd::new(linear_model(5), full_batch(x, y), None, config).map(|_| ());
    assert_err!(result, TrainError::MissingTestData);
}

#[test]
fn test_input_dimension_must_match() {
    let x = random_inputs(8, 3, 1);
    let y = random_inputs(8, 1, 2);
    let result = Sgd::new(linear_model(6), full_batch(x, y), None, SgdConfig::new()).map(|_| ());
    assert_err!(result, TrainError::Config(_));
}

#[test]
fn test_target_shape_mismatch_aborts_run() {
    let x = random_inputs(8, 1, 1);
    let y = random_inputs(8, 2, 2);
    let mut sgd = Sgd::new(linear_model(7), full_batch(x, y), None, SgdConfig::new()).unwrap();
    assert_err!(sgd.run(3), TrainError::Tensor(TensorError::ShapeMismatch { .. }));
    assert_eq!(sgd.step(), 0);
}

#[test]
fn test_step_unit_selects_schedule_clock() {
    // 学习率在第0步为0、此后为0.5
    let learning_rate = Scheduler::linear_ramp_up(0.0, 0.5, 1).unwrap();
    let run_one_epoch = |step_unit| {
        let (x, y) = line(2.0, 1.0);
        let provider = Box::new(MiniBatchDataProvider::new(x, y, 4).unwrap());
        let config = SgdConfig::new()
            .learning_rate(learning_rate)
            .step_unit(step_unit);
        let model = linear_model(8);
        let initial = model.top_layer().parameter().value.clone();
        let mut sgd = Sgd::new(model, provider, None, config).unwrap();
        sgd.run(1).unwrap();
        assert_eq!(sgd.step(), 4);
        (initial, sgd.into_model().top_layer().parameter().value.clone())
    };

    let (initial, after) = run_one_epoch(StepUnit::Epoch);
    assert_eq!(initial, after);
    let (initial, after) = run_one_epoch(StepUnit::Batch);
    assert_ne!(initial, after);
}

#[test]
fn test_dedicated_thread_pool() {
    let train = |num_threads: Option<usize>| {
        let x = random_inputs(60, 4, 11);
        let y = one_hot(60, 3);
        let net = NeuralNetBuilder::new(4, 3)
            .hidden_layers(&[8])
            .dropout(0.2)
            .seed(12)
            .build::<f64>()
            .unwrap();
        let mut config = SgdConfig::new()
            .update_rule(UpdateRule::Momentum)
            .momentum(0.5)
            .seed(13);
        if let Some(n) = num_threads {
            config = config.num_threads(n);
        }
        let provider = Box::new(MiniBatchDataProvider::new(x, y, 16).unwrap());
        let mut sgd = Sgd::new(net, provider, None, config).unwrap();
        sgd.run(3).unwrap();
        sgd.monitor()
            .train_errors()
            .iter()
            .map(|r| r.value)
            .collect::<Vec<_>>()
    };

    let pooled = train(Some(2));
    let global = train(None);
    assert_eq!(pooled.len(), 3);
    for (a, b) in pooled.iter().zip(&global) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_classification_with_test_data() {
    let x = random_inputs(90, 5, 21);
    let y = one_hot(90, 3);
    let net = NeuralNetBuilder::new(5, 3)
        .hidden_layers(&[16])
        .seed(22)
        .build::<f64>()
        .unwrap();
    let config = SgdConfig::new()
        .update_rule(UpdateRule::Nesterov)
        .momentum(0.9)
        .learning_rate(0.05)
        .seed(23);
    let train = Box::new(MiniBatchDataProvider::new(x.clone(), y.clone(), 30).unwrap());
    let test: BoxedProvider<f64> = Box::new(MiniBatchDataProvider::new(x, y, 45).unwrap());
    let mut sgd = Sgd::new(net, train, Some(test), config).unwrap();

    assert_eq!(sgd.run(30).unwrap(), OptimizerState::Exhausted);
    let monitor = sgd.monitor();
    assert_eq!(monitor.test_errors().len(), 30);
    assert!(monitor.last_train_error() < monitor.first_train_error());
    for record in monitor.test_errors() {
        assert!((0.0..=1.0).contains(&record.value));
    }
    // 速度按参数维护
    for parameter in sgd.model().parameters() {
        let velocity = sgd.updater().velocity(parameter.id()).unwrap();
        assert_eq!(velocity.shape(), parameter.value.shape());
    }
}

/// 每步都返回预设梯度的模型；`gradients`里缺的参数就没有梯度
struct Scripted {
    parameters: Vec<Parameter<f64>>,
    gradients: Vec<(ParamId, Matrix<f64>)>,
}

impl Scripted {
    fn scalar_parameters(count: usize) -> Vec<Parameter<f64>> {
        (0..count)
            .map(|i| Parameter::new(ParamId::new(i), format!("w{i}"), Matrix::zeros(1, 1)))
            .collect()
    }
}

impl Model<f64> for Scripted {
    type Activations = ();

    fn n_in(&self) -> usize {
        1
    }

    fn parameters(&self) -> Vec<&Parameter<f64>> {
        self.parameters.iter().collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<f64>> {
        self.parameters.iter_mut().collect()
    }

    fn forward(&self, _: &Matrix<f64>, _: Mode, _: &mut Sampler) -> Result<(), TensorError> {
        Ok(())
    }

    fn loss(&self, _: &(), _: &Matrix<f64>) -> Result<f64, TensorError> {
        Ok(1.0)
    }

    fn backward(&self, _: &(), _: &Matrix<f64>) -> Result<Gradients<f64>, TensorError> {
        Ok(self.gradients.iter().cloned().collect())
    }

    fn test_error(
        &self,
        _: &Matrix<f64>,
        _: &Matrix<f64>,
        _: &mut Sampler,
    ) -> Result<f64, TensorError> {
        Ok(0.0)
    }
}

#[test]
fn test_missing_gradient() {
    let model = Scripted {
        parameters: vec![Parameter::new(ParamId::new(3), "w", Matrix::zeros(1, 1))],
        gradients: vec![],
    };
    let (x, y) = line(1.0, 0.0);
    let mut sgd = Sgd::new(model, full_batch(x, y), None, SgdConfig::new()).unwrap();
    assert_err!(sgd.run(1), TrainError::MissingGradient(id) if id.get() == 3);
}

#[test]
fn test_missing_gradient_leaves_parameters_untouched() {
    // 第一个参数有梯度，第二个没有：整步都不更新
    let model = Scripted {
        parameters: Scripted::scalar_parameters(2),
        gradients: vec![(ParamId::new(0), Matrix::ones(1, 1))],
    };
    let (x, y) = line(1.0, 0.0);
    let mut sgd = Sgd::new(model, full_batch(x, y), None, SgdConfig::new()).unwrap();
    assert_err!(sgd.run(1), TrainError::MissingGradient(id) if id.get() == 1);
    assert_eq!(sgd.model().parameters[0].value[[0, 0]], 0.0);
    assert_eq!(sgd.model().parameters[1].value[[0, 0]], 0.0);
    assert_eq!(sgd.step(), 0);
}

#[test]
fn test_gradient_shape_mismatch_leaves_parameters_untouched() {
    let model = Scripted {
        parameters: Scripted::scalar_parameters(2),
        gradients: vec![
            (ParamId::new(0), Matrix::ones(1, 1)),
            (ParamId::new(1), Matrix::ones(2, 2)),
        ],
    };
    let (x, y) = line(1.0, 0.0);
    let mut sgd = Sgd::new(model, full_batch(x, y), None, SgdConfig::new()).unwrap();
    let result = sgd.run(1);
    assert_err!(
        result,
        TrainError::Tensor(TensorError::ShapeMismatch {
            operator: Operator::ParameterUpdate,
            expected,
            got,
            ..
        }) if expected == &[1, 1] && got == &[2, 2]
    );
    assert_eq!(sgd.model().parameters[0].value[[0, 0]], 0.0);
    assert_eq!(sgd.state(), OptimizerState::Running);
}

#[test]
fn test_divergence_reported_after_the_whole_step() {
    // 第一个参数发散，第二个参数的更新仍会完成
    let model = Scripted {
        parameters: Scripted::scalar_parameters(2),
        gradients: vec![
            (ParamId::new(0), Matrix::new(&[f64::MAX], 1, 1).unwrap()),
            (ParamId::new(1), Matrix::ones(1, 1)),
        ],
    };
    let (x, y) = line(1.0, 0.0);
    let config = SgdConfig::new().learning_rate(10.0);
    let mut sgd = Sgd::new(model, full_batch(x, y), None, config).unwrap();
    assert_err!(sgd.run(1), TrainError::NumericDivergence { step: 0, .. });
    assert!(sgd.model().parameters[0].value[[0, 0]].is_infinite());
    assert_abs_diff_eq!(sgd.model().parameters[1].value[[0, 0]], -10.0);
}

#[test]
fn test_drop_last_without_full_batch_is_rejected() {
    // 16行数据、batch大小32、丢弃不完整batch：一个batch也没有
    let (x, y) = line(1.0, 0.0);
    let train: BoxedProvider<f64> =
        Box::new(MiniBatchDataProvider::new(x, y, 32).unwrap().drop_last(true));
    let result = Sgd::new(linear_model(9), train, None, SgdConfig::new()).map(|_| ());
    assert_err!(result, TrainError::Data(DataError::EmptyDataset));

    // 测试数据同样检查
    let (x, y) = line(1.0, 0.0);
    let (test_x, test_y) = line(1.0, 0.0);
    let test: BoxedProvider<f64> = Box::new(
        MiniBatchDataProvider::new(test_x, test_y, 17)
            .unwrap()
            .drop_last(true),
    );
    let result = Sgd::new(linear_model(9), full_batch(x, y), Some(test), SgdConfig::new())
        .map(|_| ());
    assert_err!(result, TrainError::Data(DataError::EmptyDataset));
}

#[test]
fn test_empty_dataset_is_rejected() {
    let result = BatchDataProvider::new(Matrix::<f64>::zeros(0, 2), Matrix::zeros(0, 1));
    assert_err!(result, DataError::EmptyDataset);
}
