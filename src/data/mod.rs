//! 数据提供模块
//!
//! 为训练循环提供按epoch重启的batch序列。
//!
//! # 主要组件
//!
//! - [`DataProvider`]: 数据提供者trait
//! - [`MiniBatchDataProvider`]: 小批量数据提供者
//! - [`BatchDataProvider`]: 全批量数据提供者
//! - [`DataError`]: 数据错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use descent_engine::data::{DataProvider, MiniBatchDataProvider};
//!
//! let train = MiniBatchDataProvider::new(train_x, train_y, 100)?;
//! for batch in train.batches() {
//!     model.forward(batch.x, Mode::Train, &mut sampler)?;
//! }
//! ```

pub mod error;
mod provider;


// Re-exports
pub use error::DataError;
pub use provider::{Batch, BatchDataProvider, DataProvider, MiniBatchDataProvider};
