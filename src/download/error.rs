//! 单次转换的终止错误。重试只在工作池内部发生，这里的每一种都直接结束本次运行。

use std::path::PathBuf;

use thiserror::Error;

use super::assembler::AssembleError;
use super::fetch::FetchError;
use super::plan::EmptySelection;
use super::segment_pool::RetrievalFailure;
use crate::capture_parser::ParseError;
use crate::remux::RemuxError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("No segments found")]
    EmptySelection,
    #[error("Download failed: segment {index} gave up after {attempts} attempts ({reason})")]
    SegmentFetchExhausted {
        index: u64,
        attempts: u32,
        reason: String,
    },
    #[error("http client init failed: {0}")]
    HttpClient(#[from] FetchError),
    #[error("ffmpeg error: {0}")]
    Remux(#[from] RemuxError),
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cancelled")]
    Cancelled,
}

impl From<EmptySelection> for RunError {
    fn from(_: EmptySelection) -> Self {
        Self::EmptySelection
    }
}

impl From<RetrievalFailure> for RunError {
    fn from(value: RetrievalFailure) -> Self {
        match value {
            RetrievalFailure::Exhausted {
                index,
                attempts,
                reason,
            } => Self::SegmentFetchExhausted {
                index,
                attempts,
                reason,
            },
            RetrievalFailure::Cancelled => Self::Cancelled,
            RetrievalFailure::WorkerPanicked { index } => Self::SegmentFetchExhausted {
                index,
                attempts: 0,
                reason: "worker panicked".to_string(),
            },
        }
    }
}

impl RunError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn from_assemble(err: AssembleError, path: impl Into<PathBuf>) -> Self {
        match err {
            AssembleError::MissingBytes { index } => Self::SegmentFetchExhausted {
                index,
                attempts: 0,
                reason: "missing segment data".to_string(),
            },
            AssembleError::Io(source) => Self::Io {
                path: path.into(),
                source,
            },
        }
    }
}
