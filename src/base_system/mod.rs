//! 基础设施：配置、日志、运行工作目录。

pub mod config;
pub mod context;
pub mod file_cleaner;
pub mod logging;
