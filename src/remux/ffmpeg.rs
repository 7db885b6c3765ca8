use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::{RemuxError, Remuxer};
use crate::base_system::context::Config;

#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    program: PathBuf,
    loglevel: String,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            loglevel: "error".to_string(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let loglevel = cfg.ffmpeg_loglevel.trim();
        Self {
            program: cfg.ffmpeg_program(),
            loglevel: if loglevel.is_empty() { "error" } else { loglevel }.to_string(),
        }
    }

    /// `-y -loglevel <lvl> -i <in> -c copy -movflags +faststart <out>`
    pub(crate) fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            self.loglevel.clone().into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-c".into(),
            "copy".into(),
            "-movflags".into(),
            "+faststart".into(),
            output.as_os_str().to_owned(),
        ]
    }
}

impl Remuxer for FfmpegRemuxer {
    fn remux(&self, input: &Path, output: &Path) -> Result<(), RemuxError> {
        let args = self.args(input, output);
        debug!(target: "remux", program = %self.program.display(), ?args, "调用 ffmpeg");

        let out = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| RemuxError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            return Err(RemuxError::ExitStatus {
                code: out.status.code(),
                stderr,
            });
        }

        info!(target: "remux", output = %output.display(), "转封装完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_stream_copy_faststart_command() {
        let remuxer = FfmpegRemuxer::new("ffmpeg");
        let args: Vec<String> = remuxer
            .args(Path::new("/tmp/run/combined.mp4"), Path::new("/out/talk.mp4"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-y",
                "-loglevel",
                "error",
                "-i",
                "/tmp/run/combined.mp4",
                "-c",
                "copy",
                "-movflags",
                "+faststart",
                "/out/talk.mp4"
            ]
        );
    }

    #[test]
    fn loglevel_comes_from_config() {
        let mut cfg = Config::default();
        cfg.ffmpeg_loglevel = "warning".to_string();
        cfg.ffmpeg_path = "/usr/local/bin/ffmpeg".to_string();
        let remuxer = FfmpegRemuxer::from_config(&cfg);
        assert_eq!(remuxer.program, PathBuf::from("/usr/local/bin/ffmpeg"));
        let args = remuxer.args(Path::new("a"), Path::new("b"));
        assert_eq!(args[2], OsString::from("warning"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let remuxer = FfmpegRemuxer::new("/nonexistent/ffmpeg-for-tests");
        let err = remuxer
            .remux(Path::new("in.mp4"), Path::new("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, RemuxError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_failure() {
        // `false` ignores its arguments and exits 1
        let remuxer = FfmpegRemuxer::new("false");
        let err = remuxer
            .remux(Path::new("in.mp4"), Path::new("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, RemuxError::ExitStatus { code: Some(1), .. }));
    }
}
