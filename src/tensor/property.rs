/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 本文件仅包含一些属性方法，不包含任何会分配新显存的运算
 */

use std::ops::{Index, IndexMut};

use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use super::{Element, Layout, Matrix};

impl<T: Element> Matrix<T> {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓快照/view(_mut)↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }
    pub fn as_array(&self) -> &Array2<T> {
        &self.data
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑快照/view(_mut)↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /// (行数, 列数)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// 矩阵中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    /// 存储顺序；既非行优先也非列优先的连续存储时返回`None`
    pub fn layout(&self) -> Option<Layout> {
        if self.data.is_standard_layout() {
            Some(Layout::RowMajor)
        } else if self.data.t().is_standard_layout() {
            Some(Layout::ColumnMajor)
        } else {
            None
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.data.get((row, col)).copied()
    }

    /// 所有元素的均值（主机端可见的标量，会等待此前的内核完成）
    pub fn mean(&self) -> T {
        self.data.mean().unwrap_or_else(T::zero)
    }

    /// 非零元素的个数
    pub fn count_nonzero(&self) -> usize {
        self.data.par_iter().filter(|&&x| x != T::zero()).count()
    }

    /// 是否所有元素都是有限值（非NaN、非无穷）
    pub fn is_finite(&self) -> bool {
        self.data.par_iter().all(|x| x.is_finite())
    }
}

impl<T: Element> Index<[usize; 2]> for Matrix<T> {
    type Output = T;

    fn index(&self, index: [usize; 2]) -> &Self::Output {
        &self.data[index]
    }
}

impl<T: Element> IndexMut<[usize; 2]> for Matrix<T> {
    fn index_mut(&mut self, index: [usize; 2]) -> &mut Self::Output {
        &mut self.data[index]
    }
}
