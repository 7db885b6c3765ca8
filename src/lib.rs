//! HAR2MP4：从浏览器抓包（HAR）中还原分段视频并转封装为 mp4。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/运行工作目录等基础设施
//! - `capture_parser`：HAR 解析与候选分段提取
//! - `download`：分段选择、并发下载、拼接与整体流程编排
//! - `remux`：调用外部 ffmpeg 转封装
//! - `ui`：无界面命令行前端

pub mod base_system;
pub mod capture_parser;
pub mod download;
pub mod remux;
pub mod ui;
