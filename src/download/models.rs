//! 下载相关的数据模型定义。
//!
//! 候选分段、选中分段、单段下载结果与进度快照。

use serde::Serialize;

/// 抓包中观察到的一次分段请求。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateSegment {
    pub url: String,
    /// 播放顺序中的位置；候选之间可能重复。
    pub index: u64,
    /// 清晰度档位，越大越好；`None` 视为最低。
    pub quality: Option<u32>,
    /// 响应头中的 content-length。
    pub declared_size: Option<u64>,
}

/// 每个 index 唯一的代表分段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedSegment {
    pub url: String,
    pub index: u64,
    pub quality: Option<u32>,
    pub declared_size: Option<u64>,
}

impl From<CandidateSegment> for SelectedSegment {
    fn from(c: CandidateSegment) -> Self {
        Self {
            url: c.url,
            index: c.index,
            quality: c.quality,
            declared_size: c.declared_size,
        }
    }
}

impl SelectedSegment {
    /// 需要校验的长度。content-length 为 0 的条目多来自缓存命中，不做校验。
    pub fn expected_len(&self) -> Option<u64> {
        self.declared_size.filter(|&n| n > 0)
    }
}

/// 单个分段的最终下载结果。失败时 `bytes` 为空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalResult {
    pub index: u64,
    pub bytes: Option<Vec<u8>>,
    pub attempts: u32,
    /// 最后一次失败的原因（仅失败时有值）。
    pub error: Option<String>,
}

impl RetrievalResult {
    pub fn succeeded(index: u64, bytes: Vec<u8>, attempts: u32) -> Self {
        Self {
            index,
            bytes: Some(bytes),
            attempts,
            error: None,
        }
    }

    pub fn failed(index: u64, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            index,
            bytes: None,
            attempts,
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.bytes.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    /// `completed / total`，范围 [0, 1]。
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed.min(self.total) as f64) / (self.total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_declared_size_is_not_verified() {
        let seg = SelectedSegment {
            url: "u".into(),
            index: 0,
            quality: None,
            declared_size: Some(0),
        };
        assert_eq!(seg.expected_len(), None);
        let seg = SelectedSegment {
            declared_size: Some(12),
            ..seg
        };
        assert_eq!(seg.expected_len(), Some(12));
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(ProgressSnapshot::default().fraction(), 0.0);
        let p = ProgressSnapshot {
            completed: 3,
            total: 4,
        };
        assert_eq!(p.fraction(), 0.75);
        let p = ProgressSnapshot {
            completed: 5,
            total: 4,
        };
        assert_eq!(p.fraction(), 1.0);
    }
}
