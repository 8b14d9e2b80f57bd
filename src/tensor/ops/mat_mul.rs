use crate::errors::{Operator, TensorError};
use crate::tensor::{Element, Matrix};

impl<T: Element> Matrix<T> {
    /// 矩阵乘法`self · other`，返回新矩阵；两个操作数都只读。
    /// 需要保证前一个矩阵的列数等于后一个矩阵的行数
    pub fn mat_mul(&self, other: &Matrix<T>) -> Result<Matrix<T>, TensorError> {
        check_inner(self.cols(), other.rows(), "前一个矩阵的列数须等于后一个矩阵的行数")?;
        Ok(Matrix::from_array(self.view().dot(&other.view())))
    }

    /// `self · otherᵀ`，不会显式分配转置矩阵
    pub fn mat_mul_t(&self, other: &Matrix<T>) -> Result<Matrix<T>, TensorError> {
        check_inner(self.cols(), other.cols(), "两个矩阵的列数须相等")?;
        Ok(Matrix::from_array(self.view().dot(&other.view().t())))
    }

    /// `selfᵀ · other`，不会显式分配转置矩阵
    pub fn t_mat_mul(&self, other: &Matrix<T>) -> Result<Matrix<T>, TensorError> {
        check_inner(self.rows(), other.rows(), "两个矩阵的行数须相等")?;
        Ok(Matrix::from_array(self.view().t().dot(&other.view())))
    }
}

fn check_inner(left: usize, right: usize, message: &str) -> Result<(), TensorError> {
    if left != right {
        return Err(TensorError::ShapeMismatch {
            operator: Operator::MatMul,
            expected: vec![left],
            got: vec![right],
            message: message.to_string(),
        });
    }
    Ok(())
}
