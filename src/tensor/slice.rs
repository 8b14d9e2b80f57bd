/*
 * @Author       : 老董
 * @Date         : 2026-03-03
 * @Description  : 列切片原语：提取/插入一段连续的列
 *
 * 两个原语都只对被寻址的子块做一次数据并行遍历，
 * 开销与被触及的元素数成正比，而与整个矩阵的大小无关。
 */

use ndarray::{Zip, s};

use super::{Element, Matrix};
use crate::errors::{Operator, TensorError};

/// 提取`x`的第`[a, b)`列
///
/// # 参数
/// - `x`: 只读
/// - `a`, `b`: 半开列区间，须满足`0 ≤ a < b ≤ x.cols()`
///
/// # 返回
/// 新分配的矩阵`y`，形状为`(x.rows(), b - a)`，满足`y[[i, j]] == x[[i, a + j]]`；
/// 其存储顺序与`x`一致（`x`为跨步视图时为行优先）
pub fn extract_columns<T: Element>(
    x: &Matrix<T>,
    a: usize,
    b: usize,
) -> Result<Matrix<T>, TensorError> {
    check_column_range(Operator::ExtractColumns, x.cols(), a, b)?;

    let block = Zip::from(x.view().slice_move(s![.., a..b])).par_map_collect(|&v| v);
    Ok(Matrix::from_array(block))
}

/// 把`y`写入`x`从第`offset`列开始的位置：`x[[i, offset + j]] = y[[i, j]]`
///
/// # 参数
/// - `y`: 只读
/// - `x`: 原地修改，且是唯一被修改的矩阵；`[offset, offset + y.cols())`以外的列保持不变
/// - `offset`: 须满足`offset + y.cols() ≤ x.cols()`，且两者行数须一致
pub fn insert_columns<T: Element>(
    y: &Matrix<T>,
    x: &mut Matrix<T>,
    offset: usize,
) -> Result<(), TensorError> {
    if y.rows() != x.rows() {
        return Err(TensorError::ShapeMismatch {
            operator: Operator::InsertColumns,
            expected: vec![x.rows()],
            got: vec![y.rows()],
            message: "被插入矩阵与目标矩阵的行数须一致".to_string(),
        });
    }
    let end = match offset.checked_add(y.cols()) {
        Some(end) if end <= x.cols() => end,
        _ => {
            return Err(TensorError::ShapeMismatch {
                operator: Operator::InsertColumns,
                expected: vec![x.cols()],
                got: vec![offset, y.cols()],
                message: format!("从第{offset}列起插入{}列超出目标矩阵的列数", y.cols()),
            });
        }
    };

    Zip::from(x.view_mut().slice_move(s![.., offset..end]))
        .and(y.view())
        .par_for_each(|dst, &src| *dst = src);
    Ok(())
}

/// 检查半开列区间`[start, end)`是否满足`0 ≤ start < end ≤ cols`
pub(crate) fn check_column_range(
    operator: Operator,
    cols: usize,
    start: usize,
    end: usize,
) -> Result<(), TensorError> {
    if start >= end || end > cols {
        return Err(TensorError::ShapeMismatch {
            operator,
            expected: vec![cols],
            got: vec![start, end],
            message: format!("列区间[{start}, {end})须非空且不超过矩阵的{cols}列"),
        });
    }
    Ok(())
}
