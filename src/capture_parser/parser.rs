//! 从抓包条目中提取候选分段。纯函数，不做任何网络或磁盘 IO。

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::har::{Har, HarEntry};
use crate::download::models::CandidateSegment;

static RE_INDEX: OnceLock<Regex> = OnceLock::new();
static RE_QUALITY: OnceLock<Regex> = OnceLock::new();

fn re_index() -> &'static Regex {
    RE_INDEX.get_or_init(|| Regex::new(r"/(\d+)\.bin(?:\?|$)").expect("compile RE_INDEX"))
}

fn re_quality() -> &'static Regex {
    RE_QUALITY.get_or_init(|| Regex::new(r"/(\d{3,4})/(\d+)\.bin").expect("compile RE_QUALITY"))
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read capture {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid capture json: {0}")]
    Json(#[from] serde_json::Error),
}

/// 读取并反序列化抓包文件。
pub fn read_capture(path: &Path) -> Result<Har, ParseError> {
    let raw = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_capture_bytes(&raw)
}

pub fn parse_capture_bytes(raw: &[u8]) -> Result<Har, ParseError> {
    // 浏览器导出的 HAR 偶尔带 UTF-8 BOM
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);
    Ok(serde_json::from_slice(raw)?)
}

/// 提取所有匹配分段路径的候选项；不匹配的条目静默跳过。输出顺序与条目顺序一致。
pub fn parse(capture: &Har) -> Vec<CandidateSegment> {
    let candidates: Vec<CandidateSegment> =
        capture.log.entries.iter().filter_map(candidate_from_entry).collect();
    debug!(
        target: "capture",
        entries = capture.log.entries.len(),
        candidates = candidates.len(),
        "解析抓包完成"
    );
    candidates
}

fn candidate_from_entry(entry: &HarEntry) -> Option<CandidateSegment> {
    let url = entry.request.url.as_deref()?;
    if !url.contains(".bin") {
        return None;
    }

    let index = re_index().captures(url)?.get(1)?.as_str().parse::<u64>().ok()?;
    let quality = re_quality()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    Some(CandidateSegment {
        url: url.to_string(),
        index,
        quality,
        declared_size: entry.response.content_length(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn har_json(entries: &[(&str, Option<&str>)]) -> String {
        let items: Vec<String> = entries
            .iter()
            .map(|(url, len)| {
                let headers = match len {
                    Some(v) => format!(r#"[{{"name":"Content-Length","value":"{v}"}}]"#),
                    None => "[]".to_string(),
                };
                format!(r#"{{"request":{{"url":"{url}"}},"response":{{"headers":{headers}}}}}"#)
            })
            .collect();
        format!(r#"{{"log":{{"entries":[{}]}}}}"#, items.join(","))
    }

    fn parse_json(json: &str) -> Vec<CandidateSegment> {
        parse(&parse_capture_bytes(json.as_bytes()).unwrap())
    }

    #[test]
    fn extracts_index_quality_and_size() {
        let got = parse_json(&har_json(&[
            ("https://cdn.example.com/v/720/0.bin", Some("1000")),
            ("https://cdn.example.com/v/480/0.bin?token=abc", Some("900")),
            ("https://cdn.example.com/v/seg/17.bin", None),
        ]));
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].index, 0);
        assert_eq!(got[0].quality, Some(720));
        assert_eq!(got[0].declared_size, Some(1000));
        assert_eq!(got[1].quality, Some(480));
        assert_eq!(got[1].url, "https://cdn.example.com/v/480/0.bin?token=abc");
        assert_eq!(got[2].index, 17);
        assert_eq!(got[2].quality, None);
        assert_eq!(got[2].declared_size, None);
    }

    #[test]
    fn skips_non_segment_entries() {
        let got = parse_json(&har_json(&[
            ("https://cdn.example.com/player.js", Some("10")),
            ("https://cdn.example.com/v/720/init.bin", Some("10")),
            ("https://cdn.example.com/v/720/3.binary", Some("10")),
            ("https://cdn.example.com/v/720/4.bin#frag", Some("10")),
            ("https://cdn.example.com/v/720/5.bin", Some("10")),
        ]));
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].index, 5);
    }

    #[test]
    fn quality_tier_needs_three_or_four_digits() {
        let got = parse_json(&har_json(&[
            ("https://c/v/72/1.bin", None),
            ("https://c/v/1080/2.bin", None),
            ("https://c/v/12345/3.bin", None),
        ]));
        assert_eq!(got[0].quality, None);
        assert_eq!(got[1].quality, Some(1080));
        assert_eq!(got[2].quality, None);
    }

    #[test]
    fn unparseable_size_is_absent() {
        let got = parse_json(&har_json(&[("https://c/v/720/1.bin", Some("n/a"))]));
        assert_eq!(got[0].declared_size, None);
    }

    #[test]
    fn overflowing_index_is_skipped() {
        let got = parse_json(&har_json(&[("https://c/v/99999999999999999999999/1/123456789012345678901234.bin", None)]));
        assert!(got.is_empty());
    }

    #[test]
    fn missing_log_yields_no_candidates() {
        assert!(parse_json("{}").is_empty());
        assert!(parse_json(r#"{"log":{}}"#).is_empty());
    }

    #[test]
    fn structurally_invalid_capture_is_rejected() {
        assert!(matches!(
            parse_capture_bytes(b"not json"),
            Err(ParseError::Json(_))
        ));
        assert!(matches!(
            parse_capture_bytes(br#"{"log":{"entries":{}}}"#),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn accepts_utf8_bom() {
        let json = format!("\u{feff}{}", har_json(&[("https://c/v/720/1.bin", None)]));
        assert_eq!(parse_json(&json).len(), 1);
    }

    #[test]
    fn read_capture_reports_missing_file() {
        let err = read_capture(Path::new("/definitely/not/here.har")).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
