/*
 * @Author       : 老董
 * @Date         : 2026-03-12
 * @Description  : SGD优化器的配置
 */

use serde::{Deserialize, Serialize};

use super::{Scheduler, UpdateRule};
use crate::errors::TrainError;

/// 调度器的计步单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUnit {
    /// 每个epoch推进一步
    #[default]
    Epoch,
    /// 每个batch推进一步
    Batch,
}

/// 早停：测试误差连续`patience`个epoch没有比最优值至少降低`min_delta`时停止
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarlyStopping {
    pub patience: usize,
    pub min_delta: f64,
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self {
            patience: 5,
            min_delta: 0.0,
        }
    }
}

/// # 示例
/// ```ignore
/// let config = SgdConfig::new()
///     .update_rule(UpdateRule::Nesterov)
///     .learning_rate(Scheduler::exponential_decay(0.1, 0.99)?)
///     .momentum(Scheduler::linear_ramp_up(0.5, 0.9, 5)?)
///     .seed(42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub update_rule: UpdateRule,
    pub learning_rate: Scheduler,
    /// 只有动量类更新规则会用到
    pub momentum: Scheduler,
    pub step_unit: StepUnit,
    pub early_stopping: Option<EarlyStopping>,
    /// 相邻两个epoch训练误差之差的绝对值低于该值时视为收敛
    pub convergence_tolerance: Option<f64>,
    /// 损失出现NaN/无穷时中止训练
    pub check_divergence: bool,
    /// dropout采样的随机种子；为`None`时取系统熵
    pub seed: Option<u64>,
    /// 训练循环所用的工作线程数；为`None`时使用全局线程池
    pub num_threads: Option<usize>,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            update_rule: UpdateRule::default(),
            learning_rate: Scheduler::constant(0.1),
            momentum: Scheduler::constant(0.0),
            step_unit: StepUnit::default(),
            early_stopping: None,
            convergence_tolerance: None,
            check_divergence: true,
            seed: None,
            num_threads: None,
        }
    }
}

impl SgdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, TrainError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TrainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TrainError> {
        serde_json::to_string_pretty(self).map_err(|e| TrainError::Config(e.to_string()))
    }

    pub fn update_rule(mut self, update_rule: UpdateRule) -> Self {
        self.update_rule = update_rule;
        self
    }

    pub fn learning_rate(mut self, schedule: impl Into<Scheduler>) -> Self {
        self.learning_rate = schedule.into();
        self
    }

    pub fn momentum(mut self, schedule: impl Into<Scheduler>) -> Self {
        self.momentum = schedule.into();
        self
    }

    pub fn step_unit(mut self, step_unit: StepUnit) -> Self {
        self.step_unit = step_unit;
        self
    }

    pub fn early_stopping(mut self, patience: usize, min_delta: f64) -> Self {
        self.early_stopping = Some(EarlyStopping {
            patience,
            min_delta,
        });
        self
    }

    pub fn convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.convergence_tolerance = Some(tolerance);
        self
    }

    pub fn check_divergence(mut self, check: bool) -> Self {
        self.check_divergence = check;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// 检查各数值项的取值范围；调度器自身已在构造时校验过
    pub fn validate(&self) -> Result<(), TrainError> {
        if let Some(early_stopping) = &self.early_stopping {
            if early_stopping.patience == 0 || !(early_stopping.min_delta >= 0.0) {
                return Err(TrainError::Config(format!(
                    "早停参数非法：patience须大于0、min_delta须非负，实际为{early_stopping:?}"
                )));
            }
        }
        if let Some(tolerance) = self.convergence_tolerance {
            if !(tolerance >= 0.0) {
                return Err(TrainError::Config(format!(
                    "收敛阈值须非负，实际为{tolerance}"
                )));
            }
        }
        if self.num_threads == Some(0) {
            return Err(TrainError::Config("工作线程数须大于0".to_string()));
        }
        Ok(())
    }
}
