/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 全库错误类型：矩阵原语、调度器、训练循环
 */

use thiserror::Error;
mod ops;
pub use self::ops::*;

use crate::data::DataError;
use crate::nn::ParamId;
use crate::nn::optimizer::OptimizerState;

/// 矩阵原语（列切片、dropout采样、参数更新等）的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// 列范围、插入偏移越界，或两个矩阵的行数不一致
    #[error("形状不匹配，故无法{operator}：期望{expected:?}，实际{got:?}（{message}）")]
    ShapeMismatch {
        operator: Operator,
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("dropout概率须在[0, 1]范围内，实际为{0}")]
    InvalidProbability(f64),
}

/// 调度器配置错误：只会在构造时出现，构造成功的调度器在任意步数都可安全取值
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("调度器参数`{parameter}`须{operator}{threshold}，实际为{value}")]
    InvalidScheduleConfig {
        parameter: &'static str,
        operator: ComparisonOperator,
        threshold: f64,
        value: f64,
    },
}

/// 训练循环的错误。任何一个batch中出现的错误都会中止整个训练，而不是跳过该batch
#[derive(Error, Debug)]
pub enum TrainError {
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("第{epoch}个epoch（第{step}步）的损失值发散：{loss}")]
    NumericDivergence { epoch: usize, step: usize, loss: f64 },
    #[error("模型没有为参数{0:?}提供梯度")]
    MissingGradient(ParamId),
    #[error("启用早停时必须提供测试数据")]
    MissingTestData,
    #[error("优化器已处于终止状态{0:?}，无法继续运行")]
    AlreadyFinished(OptimizerState),
    #[error("配置错误：{0}")]
    Config(String),
}
