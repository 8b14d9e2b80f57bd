/*
 * @Author       : 老董
 * @Date         : 2026-03-05
 * @Description  : 逐元素/逐行的数据并行内核
 */

use ndarray::parallel::prelude::*;
use ndarray::{Axis, Zip};

use crate::errors::{Operator, TensorError};
use crate::tensor::{Element, Matrix};

impl<T: Element> Matrix<T> {
    /// 对每个元素施加`f`，返回新矩阵（`self`只读）
    pub fn map<F>(&self, f: F) -> Matrix<T>
    where
        F: Fn(T) -> T + Sync + Send,
    {
        Matrix::from_array(Zip::from(self.view()).par_map_collect(|&v| f(v)))
    }

    /// 原地对每个元素施加`f`
    pub fn map_inplace<F>(&mut self, f: F)
    where
        F: Fn(T) -> T + Sync + Send,
    {
        Zip::from(self.view_mut()).par_for_each(|v| *v = f(*v));
    }

    /// 逐元素合并两个同形状矩阵：`out[i, j] = f(self[i, j], other[i, j])`，返回新矩阵
    pub fn zip_map<F>(&self, other: &Matrix<T>, f: F) -> Result<Matrix<T>, TensorError>
    where
        F: Fn(T, T) -> T + Sync + Send,
    {
        self.check_same_shape(other)?;
        let data = Zip::from(self.view())
            .and(other.view())
            .par_map_collect(|&a, &b| f(a, b));
        Ok(Matrix::from_array(data))
    }

    /// 原地逐元素合并：`self[i, j] = f(self[i, j], other[i, j])`，`other`只读
    pub fn zip_map_inplace<F>(&mut self, other: &Matrix<T>, f: F) -> Result<(), TensorError>
    where
        F: Fn(T, T) -> T + Sync + Send,
    {
        self.check_same_shape(other)?;
        Zip::from(self.view_mut())
            .and(other.view())
            .par_for_each(|a, &b| *a = f(*a, b));
        Ok(())
    }

    /// 原地乘以标量
    pub fn scale_inplace(&mut self, factor: T) {
        self.map_inplace(|v| v * factor);
    }

    /// 逐行softmax，返回新矩阵。先减去行最大值以免指数溢出
    pub fn softmax_rows(&self) -> Matrix<T> {
        let mut out = self.clone();
        Zip::from(out.view_mut().rows_mut()).par_for_each(|mut row| {
            let max = row.iter().fold(T::neg_infinity(), |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        });
        out
    }

    /// 每一行最大元素的列号
    pub fn argmax_rows(&self) -> Vec<usize> {
        self.as_array()
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, T::neg_infinity()), |(best, max), (j, &v)| {
                        if v > max { (j, v) } else { (best, max) }
                    })
                    .0
            })
            .collect()
    }

    /// 所有元素之和，以`f64`累加
    pub fn sum_f64(&self) -> f64 {
        self.as_array().par_iter().map(|v| v.as_f64()).sum()
    }

    fn check_same_shape(&self, other: &Matrix<T>) -> Result<(), TensorError> {
        if !self.is_same_shape(other) {
            return Err(TensorError::ShapeMismatch {
                operator: Operator::ElementWise,
                expected: vec![self.rows(), self.cols()],
                got: vec![other.rows(), other.cols()],
                message: "逐元素运算的两个矩阵形状须相同".to_string(),
            });
        }
        Ok(())
    }
}
