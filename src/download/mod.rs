//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`       数据模型（CandidateSegment / SelectedSegment / RetrievalResult 等）
//! - `plan`         同 index 分段去重与排序
//! - `fetch`        单次 HTTP 请求
//! - `retry`        单段重试与长度校验
//! - `segment_pool` 分段并发下载工作池
//! - `progress`     进度上报与 CLI 进度条
//! - `assembler`    按 index 拼接
//! - `error`        运行级错误
//! - `downloader`   单次转换主流程编排

pub mod assembler;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod models;
pub mod plan;
pub mod progress;
pub mod retry;
pub mod segment_pool;

pub use downloader::{HarConverter, RunHooks};
pub use error::RunError;
