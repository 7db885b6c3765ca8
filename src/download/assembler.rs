//! 按 index 升序拼接分段，不加任何分隔或填充。顺序只看 index，与下载完成顺序无关。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::models::RetrievalResult;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("segment {index} has no data")]
    MissingBytes { index: u64 },
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// 拼接到内存。
pub fn assemble(results: Vec<RetrievalResult>) -> Result<Vec<u8>, AssembleError> {
    let cap = results
        .iter()
        .map(|r| r.bytes.as_ref().map_or(0, Vec::len))
        .sum();
    let mut out = Vec::with_capacity(cap);
    write_assembled(results, &mut out)?;
    Ok(out)
}

/// 拼接到任意 writer，返回写入的字节数。
pub fn write_assembled<W: Write>(
    mut results: Vec<RetrievalResult>,
    out: &mut W,
) -> Result<u64, AssembleError> {
    // 先检查再写，避免写出残缺的流
    if let Some(missing) = results.iter().find(|r| !r.success()) {
        return Err(AssembleError::MissingBytes {
            index: missing.index,
        });
    }

    results.sort_by_key(|r| r.index);
    let mut written = 0u64;
    for res in results {
        if let Some(bytes) = res.bytes {
            out.write_all(&bytes)?;
            written += bytes.len() as u64;
        }
    }
    out.flush()?;
    Ok(written)
}

/// 拼接并写入文件（交给转封装步骤的输入）。
pub fn assemble_to_file(results: Vec<RetrievalResult>, path: &Path) -> Result<u64, AssembleError> {
    let segments = results.len();
    let mut file = BufWriter::new(File::create(path)?);
    let written = write_assembled(results, &mut file)?;
    file.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    info!(
        target: "download",
        segments,
        bytes = written,
        path = %path.display(),
        "分段拼接完成"
    );
    Ok(written)
}
