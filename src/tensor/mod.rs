/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 设备端稠密矩阵。所有逐元素运算都以单次数据并行内核（rayon）完成，
 *                 不在主机端逐行迭代
 */

use ndarray::{Array2, ShapeBuilder, Zip};
use serde::{Deserialize, Serialize};

use crate::errors::{Operator, TensorError};

mod dropout;
mod element;
mod ops;
mod property;
mod slice;

#[cfg(test)]
mod tests;

pub(crate) use dropout::thin_region;
pub use dropout::{DropoutMask, sample_dropout_mask};
pub use element::Element;
pub(crate) use slice::check_column_range;
pub use slice::{extract_columns, insert_columns};

/// 矩阵在内存中的存储顺序。各原语都只按逻辑上的(行, 列)坐标工作，与存储顺序无关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Layout {
    /// 行优先（C顺序）
    #[default]
    RowMajor,
    /// 列优先（Fortran顺序）
    ColumnMajor,
}

/// 二维稠密矩阵，元素类型为`f32`或`f64`
///
/// 每个原语都会在文档中注明各参数是只读、返回新矩阵还是原地修改。
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Element> {
    data: Array2<T>,
}

impl<T: Element> Matrix<T> {
    /// 按行优先顺序用`data`创建一个`rows`×`cols`的矩阵，`data`的长度须等于`rows * cols`
    pub fn new(data: &[T], rows: usize, cols: usize) -> Result<Self, TensorError> {
        let data = Array2::from_shape_vec((rows, cols), data.to_vec()).map_err(|_| {
            TensorError::ShapeMismatch {
                operator: Operator::Create,
                expected: vec![rows * cols],
                got: vec![data.len()],
                message: "数据长度须等于行数与列数之积".to_string(),
            }
        })?;
        Ok(Self { data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::zeros_with_layout(rows, cols, Layout::RowMajor)
    }

    pub fn zeros_with_layout(rows: usize, cols: usize, layout: Layout) -> Self {
        Self::from_elem_with_layout(rows, cols, T::zero(), layout)
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::from_elem_with_layout(rows, cols, T::one(), Layout::RowMajor)
    }

    pub fn from_elem_with_layout(rows: usize, cols: usize, value: T, layout: Layout) -> Self {
        let data = match layout {
            Layout::RowMajor => Array2::from_elem((rows, cols), value),
            Layout::ColumnMajor => Array2::from_elem((rows, cols).f(), value),
        };
        Self { data }
    }

    pub fn from_array(data: Array2<T>) -> Self {
        Self { data }
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    /// 返回一个按`layout`存储、逻辑内容相同的新矩阵（`self`只读）
    pub fn to_layout(&self, layout: Layout) -> Self {
        let (rows, cols) = self.shape();
        let mut out = Self::zeros_with_layout(rows, cols, layout);
        Zip::from(&mut out.data)
            .and(&self.data)
            .par_for_each(|o, &x| *o = x);
        out
    }
}
