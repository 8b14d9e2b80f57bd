/*
 * @Author       : 老董
 * @Date         : 2026-03-06
 * @Description  : 数据提供者：按epoch产出有限、可重启的batch序列
 *
 * 数据在构造时一次性按行切分为设备端的batch矩阵，之后每个epoch只借出引用，不再复制。
 */

use ndarray::s;

use super::DataError;
use crate::tensor::{Element, Matrix};

/// 一个batch：输入与目标各占一个矩阵，行数相同。对优化器只读
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a, T: Element> {
    pub x: &'a Matrix<T>,
    pub y: &'a Matrix<T>,
}

impl<T: Element> Batch<'_, T> {
    pub fn rows(&self) -> usize {
        self.x.rows()
    }
}

/// 训练/测试数据的来源
///
/// 每次调用[`DataProvider::batches`]都从头开始一个新的epoch。
pub trait DataProvider<T: Element> {
    /// 输入维度
    fn n_in(&self) -> usize;

    /// 目标维度
    fn n_out(&self) -> usize;

    /// 样本总数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 每个epoch产出的batch数
    fn num_batches(&self) -> usize;

    /// 本epoch的batch序列
    fn batches(&self) -> Box<dyn Iterator<Item = Batch<'_, T>> + '_>;
}

/// 小批量数据提供者
///
/// # 示例
/// ```ignore
/// let train = MiniBatchDataProvider::new(train_x, train_y, 100)?.drop_last(true);
/// for batch in train.batches() {
///     // batch.x, batch.y
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MiniBatchDataProvider<T: Element> {
    chunks: Vec<(Matrix<T>, Matrix<T>)>,
    batch_size: usize,
    len: usize,
    drop_last: bool,
}

impl<T: Element> MiniBatchDataProvider<T> {
    /// # 参数
    /// - `x`: 输入，每行一个样本
    /// - `y`: 目标，行数须与`x`一致
    /// - `batch_size`: 批大小，须大于0；最后一个batch可能不足
    pub fn new(x: Matrix<T>, y: Matrix<T>, batch_size: usize) -> Result<Self, DataError> {
        if batch_size == 0 {
            return Err(DataError::InvalidBatchSize);
        }
        check_rows(&x, &y)?;

        let len = x.rows();
        let chunks = (0..len)
            .step_by(batch_size)
            .map(|start| {
                let end = (start + batch_size).min(len);
                (slice_rows(&x, start, end), slice_rows(&y, start, end))
            })
            .collect();
        Ok(Self {
            chunks,
            batch_size,
            len,
            drop_last: false,
        })
    }

    /// 设置是否丢弃最后一个不完整的批次
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl<T: Element> DataProvider<T> for MiniBatchDataProvider<T> {
    fn n_in(&self) -> usize {
        self.chunks.first().map_or(0, |(x, _)| x.cols())
    }

    fn n_out(&self) -> usize {
        self.chunks.first().map_or(0, |(_, y)| y.cols())
    }

    fn len(&self) -> usize {
        self.len
    }

    fn num_batches(&self) -> usize {
        if self.drop_last {
            self.len / self.batch_size
        } else {
            self.chunks.len()
        }
    }

    fn batches(&self) -> Box<dyn Iterator<Item = Batch<'_, T>> + '_> {
        Box::new(
            self.chunks
                .iter()
                .take(self.num_batches())
                .map(|(x, y)| Batch { x, y }),
        )
    }
}

/// 全批量数据提供者：每个epoch只产出一个包含全部样本的batch
#[derive(Debug, Clone)]
pub struct BatchDataProvider<T: Element> {
    x: Matrix<T>,
    y: Matrix<T>,
}

impl<T: Element> BatchDataProvider<T> {
    pub fn new(x: Matrix<T>, y: Matrix<T>) -> Result<Self, DataError> {
        check_rows(&x, &y)?;
        Ok(Self { x, y })
    }
}

impl<T: Element> DataProvider<T> for BatchDataProvider<T> {
    fn n_in(&self) -> usize {
        self.x.cols()
    }

    fn n_out(&self) -> usize {
        self.y.cols()
    }

    fn len(&self) -> usize {
        self.x.rows()
    }

    fn num_batches(&self) -> usize {
        1
    }

    fn batches(&self) -> Box<dyn Iterator<Item = Batch<'_, T>> + '_> {
        Box::new(std::iter::once(Batch {
            x: &self.x,
            y: &self.y,
        }))
    }
}

fn check_rows<T: Element>(x: &Matrix<T>, y: &Matrix<T>) -> Result<(), DataError> {
    if x.rows() != y.rows() {
        return Err(DataError::RowMismatch {
            inputs: x.rows(),
            targets: y.rows(),
        });
    }
    if x.rows() == 0 {
        return Err(DataError::EmptyDataset);
    }
    Ok(())
}

fn slice_rows<T: Element>(m: &Matrix<T>, start: usize, end: usize) -> Matrix<T> {
    Matrix::from_array(m.view().slice(s![start..end, ..]).to_owned())
}
