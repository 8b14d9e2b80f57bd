/*
 * @Author       : 老董
 * @Date         : 2026-03-04
 * @Description  : 设备端随机数采样器
 *
 * 基于计数器：每次内核启动消耗一个计数值，每一行再由(种子, 计数值, 行号)派生出独立的随机数流，
 * 因此同一种子下的结果与线程调度无关、可复现。
 */

use ndarray::{Array2, ShapeBuilder, Zip};
use rand::distributions::OpenClosed01;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::errors::TensorError;
use crate::tensor::{DropoutMask, Element, Layout, Matrix};


#[derive(Debug, Clone)]
pub struct Sampler {
    seed: u64,
    launches: u64,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self { seed, launches: 0 }
    }

    /// 以系统熵为种子
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 已启动的内核次数
    pub fn launches(&self) -> u64 {
        self.launches
    }

    /// 生成(0, 1]内独立同分布的均匀随机矩阵（不会出现0，便于区分被dropout置零的元素）
    pub fn gen_uniform<T: Element>(&mut self, rows: usize, cols: usize) -> Matrix<T> {
        self.gen_uniform_with_layout(rows, cols, Layout::RowMajor)
    }

    pub fn gen_uniform_with_layout<T: Element>(
        &mut self,
        rows: usize,
        cols: usize,
        layout: Layout,
    ) -> Matrix<T> {
        self.fill(rows, cols, layout, |rng| {
            let u: f64 = rng.sample(OpenClosed01);
            T::cast(u)
        })
    }

    /// 生成服从N(mean, std_dev²)的随机矩阵
    pub fn gen_normal<T: Element>(
        &mut self,
        rows: usize,
        cols: usize,
        mean: f64,
        std_dev: f64,
    ) -> Matrix<T> {
        self.fill(rows, cols, Layout::RowMajor, |rng| {
            let z: f64 = rng.sample(StandardNormal);
            T::cast(mean + std_dev * z)
        })
    }

    /// 以概率`p`丢弃`x`（或其`columns`列区间）中的元素，语义同[`crate::tensor::sample_dropout_mask`]
    pub fn sample_dropout_mask<T: Element>(
        &mut self,
        x: &mut Matrix<T>,
        p: f64,
        columns: Option<(usize, usize)>,
    ) -> Result<DropoutMask, TensorError> {
        let launch = self.next_launch();
        crate::tensor::thin_region(x, p, columns, |row| row_seed(launch, row))
    }

    /// 启动一次逐行并行的填充内核
    fn fill<T, F>(&mut self, rows: usize, cols: usize, layout: Layout, draw: F) -> Matrix<T>
    where
        T: Element,
        F: Fn(&mut SmallRng) -> T + Sync,
    {
        let launch = self.next_launch();
        let mut data = match layout {
            Layout::RowMajor => Array2::zeros((rows, cols)),
            Layout::ColumnMajor => Array2::zeros((rows, cols).f()),
        };
        Zip::indexed(data.rows_mut()).par_for_each(|i, row| {
            let mut rng = SmallRng::seed_from_u64(row_seed(launch, i));
            for v in row {
                *v = draw(&mut rng);
            }
        });
        Matrix::from_array(data)
    }

    /// 返回本次内核启动的流标识，并推进计数器
    fn next_launch(&mut self) -> u64 {
        let stream = splitmix64(self.seed ^ splitmix64(self.launches));
        self.launches += 1;
        stream
    }
}

/// 由内核流标识与行号派生该行随机数生成器的种子
fn row_seed(launch: u64, row: usize) -> u64 {
    splitmix64(launch ^ splitmix64(row as u64).rotate_left(17))
}

/// `SplitMix64`的终结函数，把相邻的输入打散为互不相关的64位值
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
