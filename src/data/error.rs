//! 数据提供者错误类型定义

use thiserror::Error;

/// 数据提供者相关错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    /// 输入与目标的样本数不一致
    #[error("输入与目标的样本数须一致: 输入{inputs}行, 目标{targets}行")]
    RowMismatch { inputs: usize, targets: usize },

    /// 数据集为空
    #[error("数据集为空")]
    EmptyDataset,

    /// 批大小非法
    #[error("批大小须大于0")]
    InvalidBatchSize,
}
