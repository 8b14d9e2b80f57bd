use std::fmt::{Debug, Display};

use ndarray::{LinalgScalar, ScalarOperand};
use num_traits::{Float, FromPrimitive};

/// 矩阵元素类型：目前只有`f32`和`f64`两种
///
/// 标量（学习率、动量、dropout概率等）在主机端统一以`f64`表示，
/// 下发到内核前通过`cast`转换为元素类型。
pub trait Element:
    Float
    + FromPrimitive
    + LinalgScalar
    + ScalarOperand
    + Debug
    + Display
    + Default
    + Send
    + Sync
    + 'static
{
    /// 元素类型的名称，仅用于日志
    const NAME: &'static str;

    fn cast(value: f64) -> Self;

    fn as_f64(self) -> f64;
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    fn cast(value: f64) -> Self {
        value as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Element for f64 {
    const NAME: &'static str = "f64";

    fn cast(value: f64) -> Self {
        value
    }

    fn as_f64(self) -> f64 {
        self
    }
}
