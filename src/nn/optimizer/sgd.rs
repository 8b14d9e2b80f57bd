/*
 * @Author       : 老董
 * @Date         : 2026-03-13
 * @Description  : 小批量随机梯度下降优化器（训练循环与状态机）
 *
 * 状态：Idle → Running → {Converged, Exhausted, EarlyStopped}，后三者均为终止状态。
 * 主机端循环是单线程的，只按顺序发起各个数据并行内核；早停只在epoch边界检查。
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use super::updater::check_gradient;
use super::{ParameterUpdater, ProgressMonitor, Schedule, ScheduleValues, SgdConfig, StepUnit};
use crate::data::{DataError, DataProvider};
use crate::distribution::Sampler;
use crate::errors::TrainError;
use crate::nn::{Mode, Model, ParamId};
use crate::tensor::{Element, Matrix};

/// 优化器可装载的数据提供者
pub type BoxedProvider<T> = Box<dyn DataProvider<T> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerState {
    Idle,
    Running,
    /// 相邻两个epoch的训练误差变化低于收敛阈值
    Converged,
    /// 用完了给定的epoch数
    Exhausted,
    /// 测试误差在耐心窗口内没有改善
    EarlyStopped,
}

impl OptimizerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OptimizerState::Converged | OptimizerState::Exhausted | OptimizerState::EarlyStopped
        )
    }
}

/// 早停所保存的最优参数
#[derive(Debug, Clone)]
struct Snapshot<T: Element> {
    epoch: usize,
    test_error: f64,
    values: HashMap<ParamId, Matrix<T>>,
}

/// SGD优化器
///
/// # 使用示例
/// ```ignore
/// let config = SgdConfig::new()
///     .update_rule(UpdateRule::Momentum)
///     .learning_rate(Scheduler::exponential_decay(0.1, 0.99)?)
///     .momentum(Scheduler::linear_ramp_up(0.5, 0.9, 5)?);
/// let mut sgd = Sgd::new(net, Box::new(train), Some(Box::new(test)), config)?;
/// let state = sgd.run(20)?;
/// println!("{:?}", sgd.monitor().last_train_error());
/// ```
pub struct Sgd<T: Element, M: Model<T>> {
    model: M,
    train_data: BoxedProvider<T>,
    test_data: Option<BoxedProvider<T>>,
    updater: Box<dyn ParameterUpdater<T>>,
    config: SgdConfig,
    monitor: ProgressMonitor,
    sampler: Sampler,
    state: OptimizerState,
    /// 已完成的epoch数
    epoch: usize,
    /// 已完成的参数更新步数（batch数）
    step: usize,
    best: Option<Snapshot<T>>,
    epochs_without_improvement: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl<T: Element, M: Model<T> + Send> Sgd<T, M> {
    /// # 参数
    /// - `model`: 被训练的模型，其参数在每一步被原地更新
    /// - `train_data`: 训练数据
    /// - `test_data`: 测试数据；启用早停时必须提供
    /// - `config`: 优化器配置
    pub fn new(
        model: M,
        train_data: BoxedProvider<T>,
        test_data: Option<BoxedProvider<T>>,
        config: SgdConfig,
    ) -> Result<Self, TrainError> {
        config.validate()?;
        if config.early_stopping.is_some() && test_data.is_none() {
            return Err(TrainError::MissingTestData);
        }
        for provider in std::iter::once(&train_data).chain(test_data.as_ref()) {
            // drop_last可能让非空数据一个batch也产不出
            if provider.is_empty() || provider.num_batches() == 0 {
                return Err(DataError::EmptyDataset.into());
            }
            if provider.n_in() != model.n_in() {
                return Err(TrainError::Config(format!(
                    "数据的输入维度{}与模型的输入维度{}不一致",
                    provider.n_in(),
                    model.n_in()
                )));
            }
        }
        let pool = match config.num_threads {
            Some(num_threads) => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|e| TrainError::Config(e.to_string()))?,
            )),
            None => None,
        };

        Ok(Self {
            model,
            train_data,
            test_data,
            updater: config.update_rule.build(),
            sampler: config.seed.map_or_else(Sampler::from_entropy, Sampler::new),
            config,
            monitor: ProgressMonitor::new(),
            state: OptimizerState::Idle,
            epoch: 0,
            step: 0,
            best: None,
            epochs_without_improvement: 0,
            pool,
        })
    }

    /// 最多训练`max_epochs`个epoch，返回训练结束时的终止状态
    ///
    /// 任何一个batch出错都会中止整个训练并返回该错误，此时状态停留在`Running`。
    /// 缺梯度或梯度形状不符会在该步更新任何参数之前报出；数值发散则在该步全部参数更新之后报出，
    /// 所以模型总是处于某一步完整更新之后的状态。
    pub fn run(&mut self, max_epochs: usize) -> Result<OptimizerState, TrainError> {
        if self.state.is_terminal() {
            return Err(TrainError::AlreadyFinished(self.state));
        }
        match self.pool.clone() {
            Some(pool) => pool.install(|| self.run_epochs(max_epochs)),
            None => self.run_epochs(max_epochs),
        }
    }

    fn run_epochs(&mut self, max_epochs: usize) -> Result<OptimizerState, TrainError> {
        self.state = OptimizerState::Running;
        info!(
            "开始训练：更新规则{}，至多{}个epoch，每个epoch{}个batch，元素类型{}",
            self.updater.name(),
            max_epochs,
            self.train_data.num_batches(),
            T::NAME
        );

        for _ in 0..max_epochs {
            let started = Instant::now();
            let train_error = self.train_epoch()?;
            let test_error = self.evaluate()?;
            let previous_train_error = self.monitor.last_train_error();
            self.monitor.report(
                self.epoch,
                self.step,
                train_error,
                test_error,
                started.elapsed(),
            );
            self.epoch += 1;

            if let Some(test_error) = test_error {
                if self.check_early_stopping(test_error) {
                    self.state = OptimizerState::EarlyStopped;
                    break;
                }
            }
            if let (Some(tolerance), Some(previous)) =
                (self.config.convergence_tolerance, previous_train_error)
            {
                if (train_error - previous).abs() < tolerance {
                    self.state = OptimizerState::Converged;
                    break;
                }
            }
        }

        if self.state == OptimizerState::Running {
            self.state = OptimizerState::Exhausted;
        }
        if matches!(
            self.state,
            OptimizerState::EarlyStopped | OptimizerState::Exhausted
        ) {
            self.restore_best();
        }
        info!(
            "训练结束：{:?}，共{}个epoch、{}步",
            self.state, self.epoch, self.step
        );
        Ok(self.state)
    }

    /// 训练一个epoch，返回按样本数加权的平均batch损失
    fn train_epoch(&mut self) -> Result<f64, TrainError> {
        let mut loss_sum = 0.0;
        let mut rows = 0;
        for batch in self.train_data.batches() {
            let values = self.schedule_values();
            let activations = self.model.forward(batch.x, Mode::Train, &mut self.sampler)?;
            let loss = self.model.loss(&activations, batch.y)?;
            if self.config.check_divergence && !loss.is_finite() {
                warn!("第{}个epoch第{}步的损失发散：{}", self.epoch, self.step, loss);
                return Err(TrainError::NumericDivergence {
                    epoch: self.epoch,
                    step: self.step,
                    loss,
                });
            }

            let gradients = self.model.backward(&activations, batch.y)?;
            for parameter in self.model.parameters() {
                let gradient = gradients
                    .get(&parameter.id())
                    .ok_or(TrainError::MissingGradient(parameter.id()))?;
                check_gradient(parameter, gradient)?;
            }
            let mut diverged = None;
            for parameter in self.model.parameters_mut() {
                let gradient = gradients
                    .get(&parameter.id())
                    .ok_or(TrainError::MissingGradient(parameter.id()))?;
                self.updater.apply(parameter, gradient, values)?;
                if diverged.is_none() && !parameter.value.is_finite() {
                    diverged = Some(parameter.name().to_string());
                }
            }
            if let (true, Some(name)) = (self.config.check_divergence, diverged) {
                warn!("参数`{}`在第{}步出现非有限值", name, self.step);
                return Err(TrainError::NumericDivergence {
                    epoch: self.epoch,
                    step: self.step,
                    loss,
                });
            }
            debug!(
                "第{}步：损失{:.6}，学习率{}，动量{}",
                self.step, loss, values.learning_rate, values.momentum
            );

            self.step += 1;
            loss_sum += loss * batch.rows() as f64;
            rows += batch.rows();
        }
        if rows == 0 {
            return Err(DataError::EmptyDataset.into());
        }
        Ok(loss_sum / rows as f64)
    }

    /// 测试数据上按样本数加权的测试误差；没有测试数据时返回`None`
    fn evaluate(&mut self) -> Result<Option<f64>, TrainError> {
        let Some(test_data) = &self.test_data else {
            return Ok(None);
        };
        let mut error_sum = 0.0;
        let mut rows = 0;
        for batch in test_data.batches() {
            let error = self.model.test_error(batch.x, batch.y, &mut self.sampler)?;
            error_sum += error * batch.rows() as f64;
            rows += batch.rows();
        }
        if rows == 0 {
            return Err(DataError::EmptyDataset.into());
        }
        Ok(Some(error_sum / rows as f64))
    }

    /// 更新最优快照；返回是否应当早停
    fn check_early_stopping(&mut self, test_error: f64) -> bool {
        let Some(early_stopping) = self.config.early_stopping else {
            return false;
        };
        let improved = self
            .best
            .as_ref()
            .is_none_or(|best| test_error < best.test_error - early_stopping.min_delta);
        if improved {
            self.best = Some(Snapshot {
                epoch: self.epoch - 1,
                test_error,
                values: self
                    .model
                    .parameters()
                    .into_iter()
                    .map(|p| (p.id(), p.value.clone()))
                    .collect(),
            });
            self.epochs_without_improvement = 0;
            return false;
        }

        self.epochs_without_improvement += 1;
        if self.epochs_without_improvement >= early_stopping.patience {
            warn!(
                "测试误差已连续{}个epoch没有改善，提前停止",
                self.epochs_without_improvement
            );
            return true;
        }
        false
    }

    /// 把参数恢复为测试误差最低时的快照
    fn restore_best(&mut self) {
        let Some(best) = &self.best else {
            return;
        };
        for parameter in self.model.parameters_mut() {
            if let Some(value) = best.values.get(&parameter.id()) {
                parameter.value = value.clone();
            }
        }
        info!(
            "恢复第{}个epoch的参数（测试误差{:.6}）",
            best.epoch, best.test_error
        );
    }

    fn schedule_values(&self) -> ScheduleValues {
        let step = match self.config.step_unit {
            StepUnit::Epoch => self.epoch,
            StepUnit::Batch => self.step,
        };
        ScheduleValues {
            learning_rate: self.config.learning_rate.value(step),
            momentum: self.config.momentum.value(step),
        }
    }

    pub fn state(&self) -> OptimizerState {
        self.state
    }

    pub fn monitor(&self) -> &ProgressMonitor {
        &self.monitor
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn updater(&self) -> &dyn ParameterUpdater<T> {
        self.updater.as_ref()
    }

    pub fn config(&self) -> &SgdConfig {
        &self.config
    }

    /// 已完成的epoch数
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// 已完成的参数更新步数
    pub fn step(&self) -> usize {
        self.step
    }

    /// 早停快照所在的epoch
    pub fn best_epoch(&self) -> Option<usize> {
        self.best.as_ref().map(|best| best.epoch)
    }
}
