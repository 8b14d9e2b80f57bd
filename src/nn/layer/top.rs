use serde::{Deserialize, Serialize};

use super::{Affine, InputDropout};
use crate::distribution::Sampler;
use crate::errors::{Operator, TensorError};
use crate::nn::{Mode, ParamId, Parameter};
use crate::tensor::{Element, Matrix};

/// 输出层的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopKind {
    /// softmax + 交叉熵；测试误差为分类错误率，目标为one-hot
    #[default]
    Softmax,
    /// 线性回归 + 平方损失 ½·mean‖ŷ − y‖²；测试误差即该损失
    LinearRegression,
}

#[derive(Debug, Clone)]
pub struct TopLayer<T: Element> {
    affine: Affine<T>,
    kind: TopKind,
}

#[derive(Debug, Clone)]
pub struct TopActivations<T: Element> {
    pub input: Matrix<T>,
    /// softmax的概率或回归的预测值
    pub output: Matrix<T>,
}

impl<T: Element> TopLayer<T> {
    pub fn new(
        id: ParamId,
        n_in: usize,
        n_out: usize,
        kind: TopKind,
        sampler: &mut Sampler,
    ) -> Result<Self, TensorError> {
        Ok(Self {
            affine: Affine::new(id, "top", n_in, n_out, sampler)?,
            kind,
        })
    }

    pub fn with_input_dropout(mut self, input_dropout: Option<InputDropout>) -> Self {
        self.affine = self.affine.with_input_dropout(input_dropout);
        self
    }

    pub fn kind(&self) -> TopKind {
        self.kind
    }

    pub fn n_in(&self) -> usize {
        self.affine.n_in()
    }

    pub fn n_out(&self) -> usize {
        self.affine.n_out()
    }

    pub fn parameter(&self) -> &Parameter<T> {
        self.affine.parameter()
    }

    pub fn parameter_mut(&mut self) -> &mut Parameter<T> {
        self.affine.parameter_mut()
    }

    pub fn weights(&self) -> Result<Matrix<T>, TensorError> {
        self.affine.weights()
    }

    pub fn bias(&self) -> Result<Matrix<T>, TensorError> {
        self.affine.bias()
    }

    pub fn forward(
        &self,
        x: &Matrix<T>,
        mode: Mode,
        sampler: &mut Sampler,
    ) -> Result<TopActivations<T>, TensorError> {
        let input = self.affine.augment(x, mode, sampler)?;
        let z = self.affine.pre_activation(&input)?;
        let output = match self.kind {
            TopKind::Softmax => z.softmax_rows(),
            TopKind::LinearRegression => z,
        };
        Ok(TopActivations { input, output })
    }

    /// batch上的平均损失
    pub fn loss(
        &self,
        activations: &TopActivations<T>,
        targets: &Matrix<T>,
    ) -> Result<f64, TensorError> {
        self.check_targets(&activations.output, targets)?;
        let n = targets.rows() as f64;
        match self.kind {
            TopKind::Softmax => {
                let eps = T::cast(1e-30);
                let log_likelihood = activations
                    .output
                    .zip_map(targets, |p, y| y * p.max(eps).ln())?
                    .sum_f64();
                Ok(-log_likelihood / n)
            }
            TopKind::LinearRegression => {
                let squared = activations
                    .output
                    .zip_map(targets, |p, y| (p - y) * (p - y))?
                    .sum_f64();
                Ok(0.5 * squared / n)
            }
        }
    }

    /// 两种输出层的δ = ∂L/∂Z 形式相同：(output − y) / N
    pub fn backward(
        &self,
        activations: &TopActivations<T>,
        targets: &Matrix<T>,
        propagate: bool,
    ) -> Result<(Matrix<T>, Option<Matrix<T>>), TensorError> {
        self.check_targets(&activations.output, targets)?;
        let inv_n = T::cast(1.0 / targets.rows() as f64);
        let delta = activations.output.zip_map(targets, |p, y| (p - y) * inv_n)?;
        self.affine.backward(&delta, &activations.input, propagate)
    }

    /// 分类错误率或回归损失
    pub fn test_error(
        &self,
        activations: &TopActivations<T>,
        targets: &Matrix<T>,
    ) -> Result<f64, TensorError> {
        match self.kind {
            TopKind::Softmax => {
                self.check_targets(&activations.output, targets)?;
                let predicted = activations.output.argmax_rows();
                let expected = targets.argmax_rows();
                let wrong = predicted
                    .iter()
                    .zip(&expected)
                    .filter(|(p, e)| p != e)
                    .count();
                Ok(wrong as f64 / targets.rows() as f64)
            }
            TopKind::LinearRegression => self.loss(activations, targets),
        }
    }

    fn check_targets(&self, output: &Matrix<T>, targets: &Matrix<T>) -> Result<(), TensorError> {
        if !output.is_same_shape(targets) {
            return Err(TensorError::ShapeMismatch {
                operator: Operator::Loss,
                expected: vec![output.rows(), output.cols()],
                got: vec![targets.rows(), targets.cols()],
                message: "目标矩阵须与输出层的输出形状相同".to_string(),
            });
        }
        Ok(())
    }
}
