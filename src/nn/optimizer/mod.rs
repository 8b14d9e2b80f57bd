/*
 * @Author       : 老董
 * @Date         : 2026-03-10
 * @Description  : 优化器模块：调度器、参数更新策略、进度监视器与SGD训练循环
 */

mod config;
mod monitor;
mod scheduler;
mod sgd;
mod updater;

pub use config::{EarlyStopping, SgdConfig, StepUnit};
pub use monitor::{ProgressMonitor, Record};
pub use scheduler::{Constant, ExponentialDecay, LinearRampUp, Schedule, Scheduler};
pub use sgd::{BoxedProvider, OptimizerState, Sgd};
pub use updater::{
    MomentumUpdate, NesterovMomentumUpdate, ParameterUpdater, ScheduleValues, SimpleSgdUpdate,
    UpdateRule,
};
