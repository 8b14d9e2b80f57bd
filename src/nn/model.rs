/*
 * @Author       : 老董
 * @Date         : 2026-03-07
 * @Description  : 优化器与模型之间的接口：参数、梯度与Model trait
 */

use std::collections::HashMap;
use std::fmt;

use crate::distribution::Sampler;
use crate::errors::TensorError;
use crate::tensor::{Element, Matrix};

/// 参数的稳定标识，在模型的整个生命周期内不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub(crate) usize);

impl ParamId {
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param#{}", self.0)
    }
}

/// 可训练参数：归模型所有，只在参数更新时被原地修改
#[derive(Debug, Clone)]
pub struct Parameter<T: Element> {
    id: ParamId,
    name: String,
    pub value: Matrix<T>,
}

impl<T: Element> Parameter<T> {
    pub fn new(id: ParamId, name: impl Into<String>, value: Matrix<T>) -> Self {
        Self {
            id,
            name: name.into(),
            value,
        }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// 按参数标识索引的梯度，每个batch重新计算
pub type Gradients<T> = HashMap<ParamId, Matrix<T>>;

/// 前向传播的模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 训练：启用dropout
    #[default]
    Train,
    /// 评估：关闭dropout，激活值按保留概率缩放
    Eval,
}

/// 被优化器驱动的模型
///
/// 前向/反向的具体数学由实现者决定，优化器只依赖这里的几个操作。
pub trait Model<T: Element> {
    /// 一次前向传播的中间结果，反向传播时需要原样传回
    type Activations;

    /// 输入维度
    fn n_in(&self) -> usize;

    /// 按固定顺序列出所有可训练参数
    fn parameters(&self) -> Vec<&Parameter<T>>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>>;

    fn forward(
        &self,
        x: &Matrix<T>,
        mode: Mode,
        sampler: &mut Sampler,
    ) -> Result<Self::Activations, TensorError>;

    /// 该batch的平均损失（主机端标量）
    fn loss(
        &self,
        activations: &Self::Activations,
        targets: &Matrix<T>,
    ) -> Result<f64, TensorError>;

    /// 损失对每个参数的梯度
    fn backward(
        &self,
        activations: &Self::Activations,
        targets: &Matrix<T>,
    ) -> Result<Gradients<T>, TensorError>;

    /// 在评估模式下计算`(x, y)`上的测试误差
    fn test_error(
        &self,
        x: &Matrix<T>,
        y: &Matrix<T>,
        sampler: &mut Sampler,
    ) -> Result<f64, TensorError>;
}
