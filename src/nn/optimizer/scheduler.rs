/*
 * @Author       : 老董
 * @Date         : 2026-03-10
 * @Description  : 学习率/动量调度器：步数 → 标量 的纯函数
 *
 * 参数在构造（含反序列化）时校验，构造成功的调度器在任意步数都可安全取值。
 */

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::errors::{ComparisonOperator, ScheduleError};

#[enum_dispatch]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scheduler {
    Constant(Constant),
    ExponentialDecay(ExponentialDecay),
    LinearRampUp(LinearRampUp),
}

#[enum_dispatch(Scheduler)]
pub trait Schedule {
    /// 第`step`步（从0开始）的取值。无副作用，同一步数总是得到同一结果
    fn value(&self, step: usize) -> f64;
}

impl Scheduler {
    pub fn constant(value: f64) -> Self {
        Constant::new(value).into()
    }

    pub fn exponential_decay(initial: f64, decay: f64) -> Result<Self, ScheduleError> {
        Ok(ExponentialDecay::new(initial, decay)?.into())
    }

    pub fn linear_ramp_up(start: f64, end: f64, horizon: usize) -> Result<Self, ScheduleError> {
        Ok(LinearRampUp::new(start, end, horizon)?.into())
    }
}

/// 普通浮点数即常数调度
impl From<f64> for Scheduler {
    fn from(value: f64) -> Self {
        Scheduler::constant(value)
    }
}

/// `value(step) = c`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Schedule for Constant {
    fn value(&self, _step: usize) -> f64 {
        self.value
    }
}

/// `value(step) = initial · decay^step`，要求`initial > 0`、`0 < decay ≤ 1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExponentialDecay")]
pub struct ExponentialDecay {
    initial: f64,
    decay: f64,
}

#[derive(Deserialize)]
struct RawExponentialDecay {
    initial: f64,
    decay: f64,
}

impl TryFrom<RawExponentialDecay> for ExponentialDecay {
    type Error = ScheduleError;

    fn try_from(raw: RawExponentialDecay) -> Result<Self, Self::Error> {
        Self::new(raw.initial, raw.decay)
    }
}

impl ExponentialDecay {
    pub fn new(initial: f64, decay: f64) -> Result<Self, ScheduleError> {
        require("initial", initial, ComparisonOperator::GreaterThan, 0.0)?;
        require("decay", decay, ComparisonOperator::GreaterThan, 0.0)?;
        require("decay", decay, ComparisonOperator::LessOrEqual, 1.0)?;
        Ok(Self { initial, decay })
    }
}

impl Schedule for ExponentialDecay {
    fn value(&self, step: usize) -> f64 {
        // 超出i32范围的步数按i32::MAX计，此时结果早已下溢为0
        let exponent = i32::try_from(step).unwrap_or(i32::MAX);
        self.initial * self.decay.powi(exponent)
    }
}

/// `value(step) = start + (end − start) · min(step, horizon) / horizon`，要求`horizon > 0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLinearRampUp")]
pub struct LinearRampUp {
    start: f64,
    end: f64,
    horizon: usize,
}

#[derive(Deserialize)]
struct RawLinearRampUp {
    start: f64,
    end: f64,
    horizon: usize,
}

impl TryFrom<RawLinearRampUp> for LinearRampUp {
    type Error = ScheduleError;

    fn try_from(raw: RawLinearRampUp) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end, raw.horizon)
    }
}

impl LinearRampUp {
    pub fn new(start: f64, end: f64, horizon: usize) -> Result<Self, ScheduleError> {
        require("horizon", horizon as f64, ComparisonOperator::GreaterThan, 0.0)?;
        Ok(Self {
            start,
            end,
            horizon,
        })
    }
}

impl Schedule for LinearRampUp {
    fn value(&self, step: usize) -> f64 {
        let progress = step.min(self.horizon) as f64 / self.horizon as f64;
        self.start + (self.end - self.start) * progress
    }
}

/// 校验`value operator threshold`；NaN不满足任何有序比较
fn require(
    parameter: &'static str,
    value: f64,
    operator: ComparisonOperator,
    threshold: f64,
) -> Result<(), ScheduleError> {
    let satisfied = match operator {
        ComparisonOperator::LessOrEqual => value <= threshold,
        ComparisonOperator::GreaterThan => value > threshold,
    };
    if satisfied {
        Ok(())
    } else {
        Err(ScheduleError::InvalidScheduleConfig {
            parameter,
            operator,
            threshold,
            value,
        })
    }
}
