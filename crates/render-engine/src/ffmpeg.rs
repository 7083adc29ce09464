//! ffmpeg and ffprobe process plumbing.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use splice_common::config::TranscoderConfig;
use splice_common::error::{truncate_diagnostic, SpliceError, SpliceResult};

/// Seconds without `out_time` advancing before a stall warning.
const STALL_WARN_SECS: u64 = 10;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Summary of one finished transcoder invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranscodeReport {
    pub elapsed_ms: u64,

    /// Last `out_time` reported by the transcoder.
    pub out_time_secs: f64,
}

/// Runs one transcoder invocation to completion.
pub trait Transcoder: Send + Sync {
    /// Execute with the given arguments. Blocks until the process exits.
    fn run(&self, args: &[String]) -> SpliceResult<TranscodeReport>;

    /// Check if the transcoder binary is available on the system.
    fn is_available(&self) -> bool;

    /// Transcoder name.
    fn name(&self) -> &str;
}

/// Reads stream properties of a media file.
pub trait MediaProber: Send + Sync {
    /// Width and height of the first video stream.
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)>;

    fn is_available(&self) -> bool;
}

/// Spawns `ffmpeg -y ...` and watches its progress pipe.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
    diagnostic_limit: usize,
    /// `None` when the step may run indefinitely.
    step_timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    pub fn new(config: &TranscoderConfig) -> Self {
        Self {
            binary: config.ffmpeg_bin.clone(),
            diagnostic_limit: config.diagnostic_limit,
            step_timeout: (config.step_timeout_secs > 0)
                .then(|| Duration::from_secs(config.step_timeout_secs)),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn run(&self, args: &[String]) -> SpliceResult<TranscodeReport> {
        tracing::debug!(binary = %self.binary, args = ?args, "Running transcoder");
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-y")
            .args(["-progress", "pipe:1", "-nostats"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| SpliceError::transcode(format!("Failed to start {}: {e}", self.binary)))?;

        tracing::info!(pid = child.id(), args_len = args.len(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SpliceError::transcode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SpliceError::transcode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let progress = Arc::new(Mutex::new(ProgressState::default()));
        let progress_task = {
            let progress = Arc::clone(&progress);
            std::thread::spawn(move || {
                let reader = BufReader::new(stdout);
                for line in reader.lines().map_while(Result::ok) {
                    if let Some((key, value)) = line.trim().split_once('=') {
                        if let Ok(mut state) = progress.lock() {
                            state.update(key, value);
                        }
                    }
                }
            })
        };

        let mut last_out_time = 0.0f64;
        let mut last_advance = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    return Err(SpliceError::transcode(format!("Failed to wait on ffmpeg: {e}")));
                }
            }

            if let Some(limit) = self.step_timeout.filter(|limit| start.elapsed() >= *limit) {
                tracing::error!(
                    timeout_secs = limit.as_secs(),
                    "ffmpeg step timed out, killing process"
                );
                let _ = child.kill();
                let _ = child.wait();
                let _ = progress_task.join();
                let _ = stderr_task.join();
                return Err(SpliceError::transcode(format!(
                    "ffmpeg step exceeded {}s timeout",
                    limit.as_secs()
                )));
            }

            let out_time = progress.lock().map(|s| s.out_time_secs).unwrap_or(last_out_time);
            if out_time > last_out_time + 0.001 {
                last_out_time = out_time;
                last_advance = Instant::now();
            } else if last_advance.elapsed().as_secs() >= STALL_WARN_SECS {
                tracing::warn!(
                    out_time_secs = out_time,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_advance = Instant::now();
            }

            std::thread::sleep(POLL_INTERVAL);
        };

        let _ = progress_task.join();
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(SpliceError::transcode(format!(
                "ffmpeg failed (status {}): {}",
                status,
                truncate_diagnostic(&stderr_output, self.diagnostic_limit)
            )));
        }

        let out_time_secs = progress.lock().map(|s| s.out_time_secs).unwrap_or(last_out_time);
        let report = TranscodeReport {
            elapsed_ms: start.elapsed().as_millis() as u64,
            out_time_secs,
        };
        tracing::info!(
            elapsed_ms = report.elapsed_ms,
            out_time_secs = report.out_time_secs,
            "ffmpeg step finished"
        );
        Ok(report)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// `ffprobe`-backed [`MediaProber`].
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: String,
}

impl FfprobeProber {
    pub fn new(config: &TranscoderConfig) -> Self {
        Self {
            binary: config.ffprobe_bin.clone(),
        }
    }
}

impl MediaProber for FfprobeProber {
    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=p=0:s=x",
            ])
            .arg(path)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let raw = String::from_utf8(output.stdout).ok()?;
        parse_dimensions(raw.lines().next()?)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }
}

/// Parse ffprobe's `WIDTHxHEIGHT` output.
fn parse_dimensions(line: &str) -> Option<(u32, u32)> {
    let (w, h) = line.trim().split_once('x')?;
    let width = w.parse::<u32>().ok()?;
    let height = h.parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        // ffmpeg reports microseconds under both keys.
        if matches!(key, "out_time_ms" | "out_time_us") {
            if let Ok(us) = value.parse::<f64>() {
                self.out_time_secs = us / 1_000_000.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_state_parses_out_time() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "2500000");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("out_time_ms", "not-a-number");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        state.update("progress", "end");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1920x1080\n"), Some((1920, 1080)));
        assert_eq!(parse_dimensions("0x1080"), None);
        assert_eq!(parse_dimensions("garbage"), None);
    }

    #[test]
    fn test_missing_binary_is_transcode_error() {
        let config = TranscoderConfig {
            ffmpeg_bin: "splice-test-no-such-binary".to_string(),
            ..TranscoderConfig::default()
        };
        let transcoder = FfmpegTranscoder::new(&config);
        assert!(!transcoder.is_available());
        let err = transcoder.run(&["out.mp4".to_string()]).unwrap_err();
        assert!(matches!(err, SpliceError::Transcode { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_process_diagnostic_is_truncated() {
        let config = TranscoderConfig {
            ffmpeg_bin: "sh".to_string(),
            diagnostic_limit: 8,
            ..TranscoderConfig::default()
        };
        let transcoder = FfmpegTranscoder::new(&config);
        // `sh -y` rejects the option and exits non-zero.
        let err = transcoder.run(&[]).unwrap_err().to_string();
        assert!(err.starts_with("Transcode error: ffmpeg failed"));
        let diagnostic = err.rsplit(": ").next().unwrap_or_default();
        assert!(diagnostic.chars().count() <= 8 + 3);
    }

    #[cfg(unix)]
    fn fake_ffmpeg(name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("splice_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("ffmpeg");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_timeout_means_unlimited() {
        let script = fake_ffmpeg("ffmpeg_unlimited", "sleep 0.3\nexit 0");
        let config = TranscoderConfig {
            ffmpeg_bin: script.to_string_lossy().into_owned(),
            step_timeout_secs: 0,
            ..TranscoderConfig::default()
        };
        let report = FfmpegTranscoder::new(&config).run(&[]).unwrap();
        assert!(report.elapsed_ms >= 300);
        std::fs::remove_dir_all(script.parent().unwrap()).ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_step_exceeding_timeout_is_killed() {
        let script = fake_ffmpeg("ffmpeg_timeout", "exec sleep 30");
        let config = TranscoderConfig {
            ffmpeg_bin: script.to_string_lossy().into_owned(),
            step_timeout_secs: 1,
            ..TranscoderConfig::default()
        };
        let started = Instant::now();
        let err = FfmpegTranscoder::new(&config).run(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Transcode error: ffmpeg step exceeded 1s timeout");
        assert!(started.elapsed() < Duration::from_secs(10));
        std::fs::remove_dir_all(script.parent().unwrap()).ok();
    }
}
