//! # 神经网络模块
//!
//! - [`optimizer`]: SGD训练循环及其调度器、参数更新策略
//! - [`Model`]: 优化器所驱动的模型接口
//! - [`NeuralNet`]: 基于融合参数全连接层的前馈网络

mod activation;
pub mod layer;
mod model;
mod net;
pub mod optimizer;

#[cfg(test)]
mod tests;

pub use activation::Activation;
pub use model::{Gradients, Mode, Model, ParamId, Parameter};
pub use net::{NetActivations, NeuralNet, NeuralNetBuilder};
