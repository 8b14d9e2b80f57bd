use super::{Affine, InputDropout};
use crate::distribution::Sampler;
use crate::errors::TensorError;
use crate::nn::{Activation, Mode, ParamId, Parameter};
use crate::tensor::{DropoutMask, Element, Matrix};

/// 隐藏层：`H = act([1 | X] · θᵀ)`，可选对输出`H`做dropout
#[derive(Debug, Clone)]
pub struct Dense<T: Element> {
    affine: Affine<T>,
    activation: Activation,
    dropout: f64,
}

/// 隐藏层一次前向传播的中间结果
#[derive(Debug, Clone)]
pub struct DenseActivations<T: Element> {
    /// 扩展输入[1 | X]（已做输入dropout）
    pub input: Matrix<T>,
    pub pre_activation: Matrix<T>,
    pub output: Matrix<T>,
    /// 训练模式且dropout > 0时才有
    pub mask: Option<DropoutMask>,
}

impl<T: Element> Dense<T> {
    pub fn new(
        id: ParamId,
        n_in: usize,
        n_out: usize,
        activation: Activation,
        dropout: f64,
        sampler: &mut Sampler,
    ) -> Result<Self, TensorError> {
        if !(0.0..=1.0).contains(&dropout) {
            return Err(TensorError::InvalidProbability(dropout));
        }
        let name = format!("hidden{}", id.get());
        Ok(Self {
            affine: Affine::new(id, &name, n_in, n_out, sampler)?,
            activation,
            dropout,
        })
    }

    pub fn with_input_dropout(mut self, input_dropout: Option<InputDropout>) -> Self {
        self.affine = self.affine.with_input_dropout(input_dropout);
        self
    }

    pub fn n_in(&self) -> usize {
        self.affine.n_in()
    }

    pub fn n_out(&self) -> usize {
        self.affine.n_out()
    }

    pub fn activation(&self) -> Activation {
        self.activation
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
    ) -> Result<DenseActivations<T>, TensorError> {
        let input = self.affine.augment(x, mode, sampler)?;
        let pre_activation = self.affine.pre_activation(&input)?;
        let mut output = self.activation.forward(&pre_activation);

        let mut mask = None;
        if self.dropout > 0.0 {
            match mode {
                Mode::Train => {
                    mask = Some(sampler.sample_dropout_mask(&mut output, self.dropout, None)?);
                }
                Mode::Eval => output.scale_inplace(T::cast(1.0 - self.dropout)),
            }
        }
        Ok(DenseActivations {
            input,
            pre_activation,
            output,
            mask,
        })
    }

    /// # 参数
    /// - `delta`: 损失对本层输出的梯度，原地被改写
    /// - `propagate`: 是否计算传给上一层的梯度
    pub fn backward(
        &self,
        activations: &DenseActivations<T>,
        mut delta: Matrix<T>,
        propagate: bool,
    ) -> Result<(Matrix<T>, Option<Matrix<T>>), TensorError> {
        if let Some(mask) = &activations.mask {
            mask.apply(&mut delta)?;
        }
        let slope = self.activation.derivative(&activations.pre_activation);
        delta.zip_map_inplace(&slope, |d, s| d * s)?;
        self.affine.backward(&delta, &activations.input, propagate)
    }
}
