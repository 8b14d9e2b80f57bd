
use crate::tensor::{Element, Layout, Matrix};

/// 元素值等于`行号 * 100 + 列号`的矩阵，便于核对切片结果
fn indexed<T: Element>(rows: usize, cols: usize, layout: Layout) -> Matrix<T> {
    let mut m = Matrix::zeros_with_layout(rows, cols, layout);
    for i in 0..rows {
        for j in 0..cols {
            m[[i, j]] = T::cast((i * 100 + j) as f64);
        }
    }
    m
}
