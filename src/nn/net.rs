/*
 * @Author       : 老董
 * @Date         : 2026-03-09
 * @Description  : 前馈神经网络：若干隐藏层 + 一个输出层
 */

use log::debug;

use super::layer::{Dense, DenseActivations, InputDropout, TopActivations, TopKind, TopLayer};
use super::{Activation, Gradients, Mode, Model, ParamId, Parameter};
use crate::distribution::Sampler;
use crate::errors::{Operator, TensorError, TrainError};
use crate::tensor::{Element, Matrix, check_column_range};

#[derive(Debug, Clone)]
pub struct NeuralNet<T: Element> {
    hidden: Vec<Dense<T>>,
    top: TopLayer<T>,
}

/// 网络一次前向传播的中间结果
#[derive(Debug, Clone)]
pub struct NetActivations<T: Element> {
    pub hidden: Vec<DenseActivations<T>>,
    pub top: TopActivations<T>,
}

impl<T: Element> NetActivations<T> {
    /// 输出层的输出（softmax概率或回归预测）
    pub fn output(&self) -> &Matrix<T> {
        &self.top.output
    }
}

impl<T: Element> NeuralNet<T> {
    pub fn hidden_layers(&self) -> &[Dense<T>] {
        &self.hidden
    }

    pub fn top_layer(&self) -> &TopLayer<T> {
        &self.top
    }

    pub fn n_out(&self) -> usize {
        self.top.n_out()
    }

    /// 评估模式下的输出
    pub fn predict(&self, x: &Matrix<T>) -> Result<Matrix<T>, TensorError> {
        let mut sampler = Sampler::new(0);
        let activations = self.forward(x, Mode::Eval, &mut sampler)?;
        Ok(activations.top.output)
    }
}

impl<T: Element> Model<T> for NeuralNet<T> {
    type Activations = NetActivations<T>;

    fn n_in(&self) -> usize {
        self.hidden
            .first()
            .map_or_else(|| self.top.n_in(), |layer| layer.n_in())
    }

    fn parameters(&self) -> Vec<&Parameter<T>> {
        self.hidden
            .iter()
            .map(|layer| layer.parameter())
            .chain(std::iter::once(self.top.parameter()))
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter<T>> {
        self.hidden
            .iter_mut()
            .map(|layer| layer.parameter_mut())
            .chain(std::iter::once(self.top.parameter_mut()))
            .collect()
    }

    fn forward(
        &self,
        x: &Matrix<T>,
        mode: Mode,
        sampler: &mut Sampler,
    ) -> Result<Self::Activations, TensorError> {
        let mut hidden: Vec<DenseActivations<T>> = Vec::with_capacity(self.hidden.len());
        for layer in &self.hidden {
            let input = hidden.last().map_or(x, |prev| &prev.output);
            let activations = layer.forward(input, mode, sampler)?;
            hidden.push(activations);
        }
        let input = hidden.last().map_or(x, |prev| &prev.output);
        let top = self.top.forward(input, mode, sampler)?;
        Ok(NetActivations { hidden, top })
    }

    fn loss(
        &self,
        activations: &Self::Activations,
        targets: &Matrix<T>,
    ) -> Result<f64, TensorError> {
        self.top.loss(&activations.top, targets)
    }

    fn backward(
        &self,
        activations: &Self::Activations,
        targets: &Matrix<T>,
    ) -> Result<Gradients<T>, TensorError> {
        let mut gradients = Gradients::with_capacity(self.hidden.len() + 1);

        let propagate = !self.hidden.is_empty();
        let (gradient, mut delta) = self.top.backward(&activations.top, targets, propagate)?;
        gradients.insert(self.top.parameter().id(), gradient);

        for (i, layer) in self.hidden.iter().enumerate().rev() {
            let Some(upstream) = delta.take() else {
                break;
            };
            let (gradient, next) = layer.backward(&activations.hidden[i], upstream, i > 0)?;
            gradients.insert(layer.parameter().id(), gradient);
            delta = next;
        }
        Ok(gradients)
    }

    fn test_error(
        &self,
        x: &Matrix<T>,
        y: &Matrix<T>,
        sampler: &mut Sampler,
    ) -> Result<f64, TensorError> {
        let activations = self.forward(x, Mode::Eval, sampler)?;
        self.top.test_error(&activations.top, y)
    }
}

/// 网络构造器
///
/// # 示例
/// ```ignore
/// let net = NeuralNetBuilder::new(20, 3)
///     .hidden_layers(&[64])
///     .activation(Activation::Relu)
///     .dropout(0.2)
///     .seed(42)
///     .build::<f32>()?;
/// ```
#[derive(Debug, Clone)]
pub struct NeuralNetBuilder {
    n_in: usize,
    n_out: usize,
    hidden: Vec<usize>,
    activation: Activation,
    dropout: f64,
    input_dropout: f64,
    input_dropout_columns: Option<(usize, usize)>,
    top: TopKind,
    seed: Option<u64>,
}

impl NeuralNetBuilder {
    pub fn new(n_in: usize, n_out: usize) -> Self {
        Self {
            n_in,
            n_out,
            hidden: Vec::new(),
            activation: Activation::default(),
            dropout: 0.0,
            input_dropout: 0.0,
            input_dropout_columns: None,
            top: TopKind::default(),
            seed: None,
        }
    }

    /// 各隐藏层的单元数；为空时网络只有输出层
    pub fn hidden_layers(mut self, sizes: &[usize]) -> Self {
        self.hidden = sizes.to_vec();
        self
    }

    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// 隐藏层输出的dropout概率
    pub fn dropout(mut self, p: f64) -> Self {
        self.dropout = p;
        self
    }

    /// 网络输入的dropout概率
    pub fn input_dropout(mut self, p: f64) -> Self {
        self.input_dropout = p;
        self
    }

    /// 只对输入的`[start, end)`列做dropout
    pub fn input_dropout_columns(mut self, start: usize, end: usize) -> Self {
        self.input_dropout_columns = Some((start, end));
        self
    }

    pub fn top(mut self, top: TopKind) -> Self {
        self.top = top;
        self
    }

    /// 权重初始化的随机种子
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build<T: Element>(self) -> Result<NeuralNet<T>, TrainError> {
        if self.n_in == 0 || self.n_out == 0 || self.hidden.contains(&0) {
            return Err(TrainError::Config(format!(
                "各层单元数须大于0：输入{}，隐藏层{:?}，输出{}",
                self.n_in, self.hidden, self.n_out
            )));
        }
        for p in [self.dropout, self.input_dropout] {
            if !(0.0..=1.0).contains(&p) {
                return Err(TensorError::InvalidProbability(p).into());
            }
        }
        if let Some((start, end)) = self.input_dropout_columns {
            check_column_range(Operator::SampleDropoutMask, self.n_in, start, end)?;
        }
        let input_dropout = (self.input_dropout > 0.0).then_some(InputDropout {
            p: self.input_dropout,
            columns: self.input_dropout_columns,
        });

        let mut sampler = self.seed.map_or_else(Sampler::from_entropy, Sampler::new);
        let mut hidden = Vec::with_capacity(self.hidden.len());
        let mut n_in = self.n_in;
        for (i, &n_out) in self.hidden.iter().enumerate() {
            let layer = Dense::new(
                ParamId::new(i),
                n_in,
                n_out,
                self.activation,
                self.dropout,
                &mut sampler,
            )?;
            let layer = if i == 0 {
                layer.with_input_dropout(input_dropout)
            } else {
                layer
            };
            hidden.push(layer);
            n_in = n_out;
        }

        let mut top = TopLayer::new(
            ParamId::new(self.hidden.len()),
            n_in,
            self.n_out,
            self.top,
            &mut sampler,
        )?;
        if hidden.is_empty() {
            top = top.with_input_dropout(input_dropout);
        }
        debug!(
            "构造网络：输入{}，隐藏层{:?}（{:?}），输出{}（{:?}），元素类型{}",
            self.n_in,
            self.hidden,
            self.activation,
            self.n_out,
            self.top,
            T::NAME
        );
        Ok(NeuralNet { hidden, top })
    }
}
