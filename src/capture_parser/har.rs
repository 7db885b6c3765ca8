//! HTTP Archive (HAR) 中实际用到的字段；其余字段一律忽略。

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Har {
    #[serde(default)]
    pub log: HarLog,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarLog {
    #[serde(default)]
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarEntry {
    #[serde(default)]
    pub request: HarRequest,
    #[serde(default)]
    pub response: HarResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarResponse {
    #[serde(default)]
    pub headers: Vec<HarHeader>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarHeader {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl HarResponse {
    /// 最后一个可解析的 `content-length`（大小写不敏感）。
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case("content-length"))
            .filter_map(|h| h.value.as_deref()?.trim().parse::<u64>().ok())
            .last()
    }
}
