//! 抓包解析：HAR 模型与候选分段提取。

pub mod har;
pub mod parser;

pub use parser::{ParseError, parse, read_capture};
