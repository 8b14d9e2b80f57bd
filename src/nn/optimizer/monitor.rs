/*
 * @Author       : 老董
 * @Date         : 2026-03-12
 * @Description  : 训练进度监视器：只追加的(epoch, 指标)序列
 */

use std::time::Duration;

use log::info;

/// 一条观测记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub epoch: usize,
    /// 记录时已完成的参数更新步数
    pub step: usize,
    pub value: f64,
}

/// 记录每个epoch的训练误差、测试误差与耗时；记录一经追加便不再修改或删除
#[derive(Debug, Clone, Default)]
pub struct ProgressMonitor {
    train_errors: Vec<Record>,
    test_errors: Vec<Record>,
    epoch_durations: Vec<Duration>,
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个epoch的报告，并输出一行日志
    pub fn report(
        &mut self,
        epoch: usize,
        step: usize,
        train_error: f64,
        test_error: Option<f64>,
        duration: Duration,
    ) {
        self.train_errors.push(Record {
            epoch,
            step,
            value: train_error,
        });
        if let Some(value) = test_error {
            self.test_errors.push(Record { epoch, step, value });
        }
        self.epoch_durations.push(duration);

        match test_error {
            Some(test_error) => info!(
                "epoch {epoch}（第{step}步）：训练误差 {train_error:.6}，测试误差 {test_error:.6}，耗时 {:.3}s",
                duration.as_secs_f64()
            ),
            None => info!(
                "epoch {epoch}（第{step}步）：训练误差 {train_error:.6}，耗时 {:.3}s",
                duration.as_secs_f64()
            ),
        }
    }

    pub fn train_errors(&self) -> &[Record] {
        &self.train_errors
    }

    pub fn test_errors(&self) -> &[Record] {
        &self.test_errors
    }

    pub fn epoch_durations(&self) -> &[Duration] {
        &self.epoch_durations
    }

    pub fn first_train_error(&self) -> Option<f64> {
        self.train_errors.first().map(|r| r.value)
    }

    pub fn last_train_error(&self) -> Option<f64> {
        self.train_errors.last().map(|r| r.value)
    }

    pub fn last_test_error(&self) -> Option<f64> {
        self.test_errors.last().map(|r| r.value)
    }

    /// 测试误差最低的记录；并列时取最早的一条
    pub fn best_test_error(&self) -> Option<Record> {
        self.test_errors
            .iter()
            .copied()
            .reduce(|best, r| if r.value < best.value { r } else { best })
    }

    /// 已报告的epoch数
    pub fn len(&self) -> usize {
        self.train_errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_errors.is_empty()
    }
}
