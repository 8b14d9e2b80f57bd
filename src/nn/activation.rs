use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TrainError;
use crate::tensor::{Element, Matrix};

/// 隐藏层激活函数。按名称解析一次，之后的每次调用都是一个`match`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
    Tanh,
    Linear,
}

impl Activation {
    pub fn f<T: Element>(self, z: T) -> T {
        match self {
            Activation::Relu => z.max(T::zero()),
            Activation::Sigmoid => T::one() / (T::one() + (-z).exp()),
            Activation::Tanh => z.tanh(),
            Activation::Linear => z,
        }
    }

    /// 以预激活值`z`表示的导数
    pub fn df<T: Element>(self, z: T) -> T {
        match self {
            Activation::Relu => {
                if z > T::zero() {
                    T::one()
                } else {
                    T::zero()
                }
            }
            Activation::Sigmoid => {
                let s = self.f(z);
                s * (T::one() - s)
            }
            Activation::Tanh => {
                let t = z.tanh();
                T::one() - t * t
            }
            Activation::Linear => T::one(),
        }
    }

    pub fn forward<T: Element>(self, z: &Matrix<T>) -> Matrix<T> {
        z.map(|v| self.f(v))
    }

    /// 逐元素导数，反向传播时与上游梯度相乘
    pub fn derivative<T: Element>(self, z: &Matrix<T>) -> Matrix<T> {
        z.map(|v| self.df(v))
    }
}

impl FromStr for Activation {
    type Err = TrainError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "linear" | "identity" => Ok(Activation::Linear),
            _ => Err(TrainError::Config(format!("未知的激活函数`{name}`"))),
        }
    }
}
