/*
 * @Author       : 老董
 * @Date         : 2026-03-11
 * @Description  : 参数更新策略：普通SGD、动量、Nesterov动量
 *
 * 每种策略对每个参数每步只调用一次`apply`，更新以单个数据并行内核原地完成。
 * 速度（动量累加器）归更新器独占，按参数标识索引，首次使用时初始化为0。
 */

use std::collections::HashMap;

use log::debug;
use ndarray::Zip;
use serde::{Deserialize, Serialize};

use crate::errors::{Operator, TensorError};
use crate::nn::{ParamId, Parameter};
use crate::tensor::{Element, Matrix};

/// 当前步的调度值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleValues {
    pub learning_rate: f64,
    pub momentum: f64,
}

/// 参数更新器 trait
pub trait ParameterUpdater<T: Element>: Send {
    /// 按`gradient`原地更新`parameter`；`gradient`只读
    fn apply(
        &mut self,
        parameter: &mut Parameter<T>,
        gradient: &Matrix<T>,
        values: ScheduleValues,
    ) -> Result<(), TensorError>;

    /// 该参数当前的速度；不维护速度的策略总是返回`None`
    fn velocity(&self, _id: ParamId) -> Option<&Matrix<T>> {
        None
    }

    /// 丢弃所有速度
    fn reset(&mut self) {}

    fn name(&self) -> &'static str;
}

/// 更新规则的配置形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRule {
    #[default]
    Simple,
    Momentum,
    Nesterov,
}

impl UpdateRule {
    pub fn build<T: Element>(self) -> Box<dyn ParameterUpdater<T>> {
        match self {
            UpdateRule::Simple => Box::new(SimpleSgdUpdate),
            UpdateRule::Momentum => Box::new(MomentumUpdate::new()),
            UpdateRule::Nesterov => Box::new(NesterovMomentumUpdate::new()),
        }
    }
}

/// `θ ← θ − lr · g`
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleSgdUpdate;

impl<T: Element> ParameterUpdater<T> for SimpleSgdUpdate {
    fn apply(
        &mut self,
        parameter: &mut Parameter<T>,
        gradient: &Matrix<T>,
        values: ScheduleValues,
    ) -> Result<(), TensorError> {
        check_gradient(parameter, gradient)?;
        let lr = T::cast(values.learning_rate);
        Zip::from(parameter.value.view_mut())
            .and(gradient.view())
            .par_for_each(|p, &g| *p = *p - lr * g);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sgd"
    }
}

/// `v ← m · v − lr · g；θ ← θ + v`
#[derive(Debug, Clone)]
pub struct MomentumUpdate<T: Element> {
    velocities: HashMap<ParamId, Matrix<T>>,
}

impl<T: Element> MomentumUpdate<T> {
    pub fn new() -> Self {
        Self {
            velocities: HashMap::new(),
        }
    }
}

impl<T: Element> Default for MomentumUpdate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> ParameterUpdater<T> for MomentumUpdate<T> {
    fn apply(
        &mut self,
        parameter: &mut Parameter<T>,
        gradient: &Matrix<T>,
        values: ScheduleValues,
    ) -> Result<(), TensorError> {
        check_gradient(parameter, gradient)?;
        let velocity = velocity_for(&mut self.velocities, parameter)?;
        let (lr, m) = (T::cast(values.learning_rate), T::cast(values.momentum));
        Zip::from(parameter.value.view_mut())
            .and(velocity.view_mut())
            .and(gradient.view())
            .par_for_each(|p, v, &g| {
                *v = m * *v - lr * g;
                *p = *p + *v;
            });
        Ok(())
    }

    fn velocity(&self, id: ParamId) -> Option<&Matrix<T>> {
        self.velocities.get(&id)
    }

    fn reset(&mut self) {
        self.velocities.clear();
    }

    fn name(&self) -> &'static str {
        "momentum"
    }
}

/// 速度递推与动量法相同，但在前瞻位置修正：
/// `v' ← m · v − lr · g；θ ← θ − m · v + (1 + m) · v'`
#[derive(Debug, Clone)]
pub struct NesterovMomentumUpdate<T: Element> {
    velocities: HashMap<ParamId, Matrix<T>>,
}

impl<T: Element> NesterovMomentumUpdate<T> {
    pub fn new() -> Self {
        Self {
            velocities: HashMap::new(),
        }
    }
}

impl<T: Element> Default for NesterovMomentumUpdate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> ParameterUpdater<T> for NesterovMomentumUpdate<T> {
    fn apply(
        &mut self,
        parameter: &mut Parameter<T>,
        gradient: &Matrix<T>,
        values: ScheduleValues,
    ) -> Result<(), TensorError> {
        check_gradient(parameter, gradient)?;
        let velocity = velocity_for(&mut self.velocities, parameter)?;
        let (lr, m) = (T::cast(values.learning_rate), T::cast(values.momentum));
        let one_plus_m = T::one() + m;
        Zip::from(parameter.value.view_mut())
            .and(velocity.view_mut())
            .and(gradient.view())
            .par_for_each(|p, v, &g| {
                let previous = *v;
                *v = m * previous - lr * g;
                *p = *p - m * previous + one_plus_m * *v;
            });
        Ok(())
    }

    fn velocity(&self, id: ParamId) -> Option<&Matrix<T>> {
        self.velocities.get(&id)
    }

    fn reset(&mut self) {
        self.velocities.clear();
    }

    fn name(&self) -> &'static str {
        "nesterov"
    }
}

/// 梯度形状须与参数一致
pub(crate) fn check_gradient<T: Element>(
    parameter: &Parameter<T>,
    gradient: &Matrix<T>,
) -> Result<(), TensorError> {
    if !parameter.value.is_same_shape(gradient) {
        return Err(TensorError::ShapeMismatch {
            operator: Operator::ParameterUpdate,
            expected: vec![parameter.value.rows(), parameter.value.cols()],
            got: vec![gradient.rows(), gradient.cols()],
            message: format!("参数`{}`的梯度形状须与参数一致", parameter.name()),
        });
    }
    Ok(())
}

/// 取出（必要时以0初始化）该参数的速度，并保证其形状与参数一致
fn velocity_for<'a, T: Element>(
    velocities: &'a mut HashMap<ParamId, Matrix<T>>,
    parameter: &Parameter<T>,
) -> Result<&'a mut Matrix<T>, TensorError> {
    let (rows, cols) = parameter.value.shape();
    let velocity = velocities.entry(parameter.id()).or_insert_with(|| {
        debug!("为参数`{}`分配{}×{}的速度", parameter.name(), rows, cols);
        Matrix::zeros_with_layout(rows, cols, parameter.value.layout().unwrap_or_default())
    });
    if velocity.shape() != (rows, cols) {
        return Err(TensorError::ShapeMismatch {
            operator: Operator::ParameterUpdate,
            expected: vec![rows, cols],
            got: vec![velocity.rows(), velocity.cols()],
            message: format!("参数`{}`的形状在训练中发生了变化", parameter.name()),
        });
    }
    Ok(velocity)
}
