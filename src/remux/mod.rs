//! 转封装：把拼接好的分段流交给外部媒体工具，输出可直接播放的 mp4。

pub mod ffmpeg;

use std::path::Path;

use thiserror::Error;

pub use ffmpeg::FfmpegRemuxer;

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("cannot start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("exited with {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },
}

/// 不重新编码，只复制流；失败时不得留下被当作成功的输出。
pub trait Remuxer: Send + Sync {
    fn remux(&self, input: &Path, output: &Path) -> Result<(), RemuxError>;
}
