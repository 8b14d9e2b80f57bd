/*
 * @Author       : 老董
 * @Date         : 2026-03-04
 * @Description  : dropout掩码采样：按概率p原地稀疏化矩阵，并返回对应的保留/丢弃掩码
 */

use ndarray::parallel::prelude::*;
use ndarray::{Array2, Zip, s};
use rand::distributions::OpenClosed01;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::slice::check_column_range;
use super::{Element, Matrix};
use crate::distribution::Sampler;
use crate::errors::{Operator, TensorError};

/// dropout掩码：`true`表示保留，`false`表示丢弃
///
/// 形状与被寻址的区域一致；每次调用都会新分配，归调用方所有。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropoutMask {
    keep: Array2<bool>,
    /// 掩码第0列在源矩阵中对应的列号
    col_offset: usize,
}

impl DropoutMask {
    pub fn shape(&self) -> (usize, usize) {
        self.keep.dim()
    }

    /// 掩码在源矩阵中覆盖的半开列区间
    pub fn columns(&self) -> (usize, usize) {
        (self.col_offset, self.col_offset + self.keep.ncols())
    }

    pub fn is_kept(&self, row: usize, col: usize) -> Option<bool> {
        self.keep.get((row, col)).copied()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.keep
    }

    pub fn keep_count(&self) -> usize {
        self.keep.par_iter().filter(|&&k| k).count()
    }

    /// 实际丢弃的元素比例
    pub fn drop_rate(&self) -> f64 {
        if self.keep.is_empty() {
            return 0.0;
        }
        1.0 - self.keep_count() as f64 / self.keep.len() as f64
    }

    /// 转为0/1矩阵（保留为1）
    pub fn to_matrix<T: Element>(&self) -> Matrix<T> {
        let data = Zip::from(&self.keep)
            .par_map_collect(|&k| if k { T::one() } else { T::zero() });
        Matrix::from_array(data)
    }

    /// 把`target`中被丢弃位置的元素置零（原地修改`target`，掩码只读），
    /// 用于反向传播时屏蔽被丢弃单元的梯度。`target`须与掩码形状相同
    pub fn apply<T: Element>(&self, target: &mut Matrix<T>) -> Result<(), TensorError> {
        if target.shape() != self.shape() {
            let (rows, cols) = self.shape();
            return Err(TensorError::ShapeMismatch {
                operator: Operator::ApplyDropoutMask,
                expected: vec![rows, cols],
                got: vec![target.rows(), target.cols()],
                message: "目标矩阵须与掩码形状相同".to_string(),
            });
        }
        Zip::from(target.view_mut())
            .and(&self.keep)
            .par_for_each(|v, &k| {
                if !k {
                    *v = T::zero();
                }
            });
        Ok(())
    }
}

/// 以概率`p`丢弃`x`（或其`columns`列区间）中的元素
///
/// 使用以系统熵为种子的临时采样器；需要可复现的结果时请用[`Sampler::sample_dropout_mask`]。
///
/// # 参数
/// - `x`: 原地修改：被丢弃的元素置零，区域外的列保持不变
/// - `p`: 丢弃概率，须在`[0, 1]`内
/// - `columns`: 只处理该半开列区间；为`None`时处理整个矩阵
///
/// # 返回
/// 新分配的掩码，形状为`(x.rows(), end - start)`
pub fn sample_dropout_mask<T: Element>(
    x: &mut Matrix<T>,
    p: f64,
    columns: Option<(usize, usize)>,
) -> Result<DropoutMask, TensorError> {
    Sampler::from_entropy().sample_dropout_mask(x, p, columns)
}

/// dropout内核：每一行由`row_seed(i)`派生独立的随机数流，各行并行处理
pub(crate) fn thin_region<T, F>(
    x: &mut Matrix<T>,
    p: f64,
    columns: Option<(usize, usize)>,
    row_seed: F,
) -> Result<DropoutMask, TensorError>
where
    T: Element,
    F: Fn(usize) -> u64 + Sync,
{
    if !(0.0..=1.0).contains(&p) {
        return Err(TensorError::InvalidProbability(p));
    }
    let (start, end) = columns.unwrap_or((0, x.cols()));
    if columns.is_some() {
        check_column_range(Operator::SampleDropoutMask, x.cols(), start, end)?;
    }

    let mut keep = Array2::from_elem((x.rows(), end - start), true);
    let mut region = x.view_mut().slice_move(s![.., start..end]);

    // 均匀数取自(0, 1]，u ≤ p 即丢弃，故 P(丢弃) = p；p = 0 时全部保留，p = 1 时全部丢弃
    Zip::indexed(region.rows_mut())
        .and(keep.rows_mut())
        .par_for_each(|i, values, kept| {
            let mut rng = SmallRng::seed_from_u64(row_seed(i));
            Zip::from(values).and(kept).for_each(|v, k| {
                let u: f64 = rng.sample(OpenClosed01);
                if u <= p {
                    *v = T::zero();
                    *k = false;
                }
            });
        });

    Ok(DropoutMask {
        keep,
        col_offset: start,
    })
}
