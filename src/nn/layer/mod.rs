/*
 * @Author       : 老董
 * @Date         : 2026-03-08
 * @Description  : 全连接层的公共部分
 *
 * 偏置与权重融合在一个参数矩阵 θ = [b | Wᵀ] 中，形状为(n_out, n_in + 1)；
 * 输入在前向时扩展为 A = [1 | X]，于是 Z = A · θᵀ，梯度 ∂L/∂θ = δᵀ · A。
 */

mod dense;
mod top;

pub use dense::{Dense, DenseActivations};
pub use top::{TopActivations, TopKind, TopLayer};

use crate::distribution::Sampler;
use crate::errors::{Operator, TensorError};
use crate::nn::{Mode, ParamId, Parameter};
use crate::tensor::{Element, Matrix, extract_columns, insert_columns};

/// 对层输入做的dropout，`columns`为`None`时作用于全部输入列
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputDropout {
    pub p: f64,
    pub columns: Option<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub(crate) struct Affine<T: Element> {
    theta: Parameter<T>,
    n_in: usize,
    n_out: usize,
    input_dropout: Option<InputDropout>,
}

impl<T: Element> Affine<T> {
    /// 偏置初始化为0，权重取自U(-s, s)，s = √(6 / (n_in + n_out))
    pub(crate) fn new(
        id: ParamId,
        name: &str,
        n_in: usize,
        n_out: usize,
        sampler: &mut Sampler,
    ) -> Result<Self, TensorError> {
        let scale = (6.0 / (n_in + n_out) as f64).sqrt();
        let mut weights = sampler.gen_uniform::<T>(n_out, n_in);
        let (two, s) = (T::cast(2.0), T::cast(scale));
        weights.map_inplace(|u| (two * u - T::one()) * s);

        let mut theta = Matrix::zeros(n_out, n_in + 1);
        insert_columns(&weights, &mut theta, 1)?;
        Ok(Self {
            theta: Parameter::new(id, name, theta),
            n_in,
            n_out,
            input_dropout: None,
        })
    }

    pub(crate) fn with_input_dropout(mut self, input_dropout: Option<InputDropout>) -> Self {
        self.input_dropout = input_dropout;
        self
    }

    pub(crate) fn n_in(&self) -> usize {
        self.n_in
    }

    pub(crate) fn n_out(&self) -> usize {
        self.n_out
    }

    pub(crate) fn parameter(&self) -> &Parameter<T> {
        &self.theta
    }

    pub(crate) fn parameter_mut(&mut self) -> &mut Parameter<T> {
        &mut self.theta
    }

    /// 权重部分Wᵀ，形状(n_out, n_in)
    pub(crate) fn weights(&self) -> Result<Matrix<T>, TensorError> {
        extract_columns(&self.theta.value, 1, self.n_in + 1)
    }

    /// 偏置部分，形状(n_out, 1)
    pub(crate) fn bias(&self) -> Result<Matrix<T>, TensorError> {
        extract_columns(&self.theta.value, 0, 1)
    }

    /// 构造扩展输入 A = [1 | X]，并按模式处理输入dropout
    pub(crate) fn augment(
        &self,
        x: &Matrix<T>,
        mode: Mode,
        sampler: &mut Sampler,
    ) -> Result<Matrix<T>, TensorError> {
        if x.cols() != self.n_in {
            return Err(TensorError::ShapeMismatch {
                operator: Operator::Forward,
                expected: vec![x.rows(), self.n_in],
                got: vec![x.rows(), x.cols()],
                message: format!("层`{}`的输入列数须等于{}", self.theta.name(), self.n_in),
            });
        }
        let mut a = Matrix::ones(x.rows(), self.n_in + 1);
        insert_columns(x, &mut a, 1)?;

        let Some(dropout) = self.input_dropout else {
            return Ok(a);
        };
        // 输入列在A中整体右移一列
        let (start, end) = dropout.columns.unwrap_or((0, self.n_in));
        let columns = (start + 1, end + 1);
        match mode {
            Mode::Train => {
                sampler.sample_dropout_mask(&mut a, dropout.p, Some(columns))?;
            }
            Mode::Eval => {
                let mut kept = extract_columns(&a, columns.0, columns.1)?;
                kept.scale_inplace(T::cast(1.0 - dropout.p));
                insert_columns(&kept, &mut a, columns.0)?;
            }
        }
        Ok(a)
    }

    /// Z = A · θᵀ
    pub(crate) fn pre_activation(&self, a: &Matrix<T>) -> Result<Matrix<T>, TensorError> {
        a.mat_mul_t(&self.theta.value)
    }

    /// ∂L/∂θ = δᵀ · A，以及（需要时）传给上一层的 δ · W
    pub(crate) fn backward(
        &self,
        delta: &Matrix<T>,
        a: &Matrix<T>,
        propagate: bool,
    ) -> Result<(Matrix<T>, Option<Matrix<T>>), TensorError> {
        let gradient = delta.t_mat_mul(a)?;
        let delta_in = if propagate {
            Some(delta.mat_mul(&self.weights()?)?)
        } else {
            None
        };
        Ok((gradient, delta_in))
    }
}
