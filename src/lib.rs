//! # Descent Engine
//!
//! `descent_engine`是一个纯rust实现的小批量梯度下降训练引擎：在数据并行的稠密矩阵上，
//! 以可插拔的参数更新策略（普通SGD、动量、Nesterov动量）和随步数变化的学习率/动量调度
//! 驱动模型训练，并提供列切片与dropout掩码采样两个并行原语。
//!

pub mod data;
pub mod distribution;
pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
