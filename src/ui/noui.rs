//! 无界面模式：找到抓包文件、逐个转换，并打印每次运行唯一的终态信息。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::base_system::context::Config;
use crate::download::{HarConverter, RunHooks};

pub fn run(config: Config, captures: Vec<PathBuf>, all: bool) -> Result<()> {
    let captures = if captures.is_empty() {
        let found = find_captures(&config.data_dir())?;
        if all {
            found
        } else {
            found.into_iter().take(1).collect()
        }
    } else {
        captures
    };

    if captures.is_empty() {
        println!("No .har file found");
        return Ok(());
    }

    let converter = HarConverter::from_config(config).context("init converter")?;
    let mut failed = 0usize;
    for capture in &captures {
        let name = capture
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| capture.display().to_string());
        println!("Processing {name}...");

        let hooks = RunHooks {
            progress: None,
            status: Some(Box::new(|msg: &str| {
                if msg.starts_with("Done") {
                    println!("{msg}");
                }
            })),
            cancel: None,
        };
        match converter.convert(capture, hooks) {
            Ok(output) => info!(target: "download", output = %output.display(), "输出文件已生成"),
            Err(err) => {
                failed += 1;
                println!("Error: {err}");
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed}/{} 个抓包转换失败", captures.len()));
    }
    Ok(())
}

/// 数据目录下的 `*.har`（不区分大小写），按文件名排序。
fn find_captures(dir: &Path) -> Result<Vec<PathBuf>> {
    let rd = fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))?;
    let mut found: Vec<PathBuf> = rd
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case("har"))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_har_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.har", "a.HAR", "notes.txt", "c.har.bak"] {
            fs::write(dir.path().join(name), b"{}").unwrap();
        }
        fs::create_dir(dir.path().join("d.har")).unwrap();

        let found = find_captures(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.HAR", "b.har"]);
    }

    #[test]
    fn no_capture_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::default().with_data_dir(dir.path());
        run(cfg, Vec::new(), false).unwrap();
    }
}
