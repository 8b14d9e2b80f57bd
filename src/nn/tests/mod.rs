mod optimizer;

use crate::distribution::Sampler;
use crate::tensor::Matrix;

/// `n`个样本、`classes`类的one-hot目标，第`i`个样本属于第`i % classes`类
fn one_hot(n: usize, classes: usize) -> Matrix<f64> {
    let mut y = Matrix::zeros(n, classes);
    for i in 0..n {
        y[[i, i % classes]] = 1.0;
    }
    y
}

fn random_inputs(n: usize, d: usize, seed: u64) -> Matrix<f64> {
    Sampler::new(seed).gen_normal(n, d, 0.0, 1.0)
}
