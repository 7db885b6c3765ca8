//! 单次转换的临时工作目录与成功后的清理。
//!
//! 每次运行都在 `temp_dir` 下创建独立目录，互不干扰；失败时保留目录与原始抓包用于排查。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

const COMBINED_FILE: &str = "combined.mp4";

/// 成功路径上的清理失败；只记日志，不影响已生成的输出。
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("cannot remove capture {path}: {source}")]
    Capture { path: PathBuf, source: io::Error },
    #[error("cannot remove workspace {path}: {source}")]
    Workspace { path: PathBuf, source: io::Error },
}

pub fn is_empty_dir(path: impl AsRef<Path>) -> io::Result<bool> {
    let path = path.as_ref();
    let mut entries = fs::read_dir(path)?;
    Ok(entries.next().is_none())
}

#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// 在 `temp_root` 下创建 `<label>-XXXXXX` 目录。
    pub fn create(temp_root: &Path, label: &str) -> io::Result<Self> {
        fs::create_dir_all(temp_root)?;
        let prefix = format!("{}-", sanitize_label(label));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(temp_root)?;
        debug!(target: "download", path = %dir.path().display(), "创建工作目录");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn combined_path(&self) -> PathBuf {
        self.dir.path().join(COMBINED_FILE)
    }

    /// 保留目录（失败路径），返回其位置。
    #[allow(deprecated)]
    pub fn preserve(self) -> PathBuf {
        self.dir.into_path()
    }

    /// 删除目录；若 temp 根目录因此变空也一并删除。
    pub fn discard(self) -> Result<(), CleanupError> {
        let path = self.dir.path().to_path_buf();
        let root = path.parent().map(Path::to_path_buf);
        self.dir
            .close()
            .map_err(|source| CleanupError::Workspace { path, source })?;
        if let Some(root) = root
            && is_empty_dir(&root).unwrap_or(false)
        {
            let _ = fs::remove_dir(&root);
        }
        Ok(())
    }
}

/// 仅在转换成功后调用。
pub fn remove_capture(path: &Path) -> Result<(), CleanupError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(target: "download", path = %path.display(), "抓包文件已不存在");
            Ok(())
        }
        Err(source) => Err(CleanupError::Capture {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(48)
        .collect();
    if cleaned.is_empty() {
        "run".to_string()
    } else {
        cleaned
    }
}
