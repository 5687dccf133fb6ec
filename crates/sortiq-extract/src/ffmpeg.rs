//! FFmpeg-backed video decoding.
//! Shells out to `ffprobe`/`ffmpeg` to read metadata and extract single
//! frames at a timestamp, scaled to the working resolution.

use crate::backend::{VideoBackend, VideoMetadata, VideoSource};
use crate::surface::{WORKING_HEIGHT, WORKING_WIDTH};
use async_trait::async_trait;
use sortiq_core::frame::{FrameBuffer, PixelFormat};
use sortiq_core::{SortiqError, SortiqResult};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

struct OpenSource {
    /// Path or URL handed to ffmpeg.
    location: String,
    /// Temporary file backing an in-memory source, deleted on release.
    temp: Option<PathBuf>,
}

/// A [`VideoBackend`] that decodes via FFmpeg subprocesses.
pub struct FfmpegBackend {
    target_width: u32,
    target_height: u32,
    current: Option<OpenSource>,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::with_target(WORKING_WIDTH, WORKING_HEIGHT)
    }

    pub fn with_target(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            current: None,
        }
    }

    /// Check if FFmpeg is available on the system.
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn materialize(source: &VideoSource) -> SortiqResult<OpenSource> {
        match source {
            VideoSource::Path(p) => {
                if !p.exists() {
                    return Err(SortiqError::invalid_input(format!(
                        "video file not found: {}",
                        p.display()
                    )));
                }
                Ok(OpenSource {
                    location: p.to_string_lossy().to_string(),
                    temp: None,
                })
            }
            VideoSource::Url(u) => Ok(OpenSource {
                location: u.clone(),
                temp: None,
            }),
            VideoSource::Bytes(bytes) => {
                let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
                let path = std::env::temp_dir()
                    .join(format!("sortiq-{}-{}.video", std::process::id(), n));
                std::fs::write(&path, bytes).map_err(|e| {
                    SortiqError::Loading(format!("could not stage in-memory source: {}", e))
                })?;
                Ok(OpenSource {
                    location: path.to_string_lossy().to_string(),
                    temp: Some(path),
                })
            }
        }
    }

    fn probe_blocking(location: &str) -> SortiqResult<VideoMetadata> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(location)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| SortiqError::Loading(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SortiqError::Loading(format!("ffprobe failed: {}", stderr)));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        let json: serde_json::Value = serde_json::from_str(&json_str)
            .map_err(|e| SortiqError::Loading(format!("failed to parse ffprobe output: {}", e)))?;

        let streams = json["streams"]
            .as_array()
            .ok_or_else(|| SortiqError::Loading("no streams found in video".into()))?;

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("video"))
            .ok_or_else(|| SortiqError::Loading("no video stream found".into()))?;

        let width = video_stream["width"]
            .as_u64()
            .ok_or_else(|| SortiqError::Loading("missing width in video stream".into()))?
            as u32;
        let height = video_stream["height"]
            .as_u64()
            .ok_or_else(|| SortiqError::Loading("missing height in video stream".into()))?
            as u32;

        let fps = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("30/1"));

        let duration_secs = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| {
                video_stream["duration"]
                    .as_str()
                    .and_then(|s| s.parse::<f64>().ok())
            })
            .unwrap_or(0.0);

        Ok(VideoMetadata {
            width,
            height,
            duration_secs,
            fps,
        })
    }

    fn extract_blocking(
        location: &str,
        timestamp_secs: f64,
        width: u32,
        height: u32,
    ) -> SortiqResult<FrameBuffer> {
        let ts_str = format!("{:.3}", timestamp_secs);

        // -ss before -i for fast seeking; raw RGBA to stdout.
        let output = Command::new("ffmpeg")
            .args(["-ss", &ts_str, "-i", location])
            .args([
                "-vframes",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", width, height),
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| SortiqError::extraction(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SortiqError::extraction(format!(
                "frame decode failed at {:.3}s: {}",
                timestamp_secs,
                stderr.lines().last().unwrap_or("unknown ffmpeg error")
            )));
        }

        let expected_size = (width as usize) * (height as usize) * 4;
        if output.stdout.len() < expected_size {
            return Err(SortiqError::extraction(format!(
                "frame decode at {:.3}s returned {} bytes, expected {}",
                timestamp_secs,
                output.stdout.len(),
                expected_size
            )));
        }

        let mut fb = FrameBuffer::new(width, height, PixelFormat::Rgba8);
        fb.data = output.stdout[..expected_size].to_vec();
        Ok(fb)
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoBackend for FfmpegBackend {
    async fn open(&mut self, source: &VideoSource) -> SortiqResult<VideoMetadata> {
        if !Self::is_available() {
            return Err(SortiqError::initialization(
                "ffmpeg/ffprobe not found in PATH",
            ));
        }

        let opened = Self::materialize(source)?;
        let location = opened.location.clone();

        let meta = tokio::task::spawn_blocking(move || Self::probe_blocking(&location))
            .await
            .map_err(|e| SortiqError::Loading(format!("probe task failed: {}", e)))?;

        match meta {
            Ok(meta) => {
                tracing::debug!(
                    source = %opened.location,
                    duration_secs = meta.duration_secs,
                    fps = meta.fps,
                    "opened video source"
                );
                self.current = Some(opened);
                Ok(meta)
            }
            Err(e) => {
                // Don't leave a staged temp file behind on a failed open.
                if let Some(temp) = &opened.temp {
                    let _ = std::fs::remove_file(temp);
                }
                Err(e)
            }
        }
    }

    async fn seek_capture(&mut self, timestamp_secs: f64) -> SortiqResult<FrameBuffer> {
        let location = self
            .current
            .as_ref()
            .map(|c| c.location.clone())
            .ok_or_else(|| SortiqError::initialization("no source open"))?;

        let (w, h) = (self.target_width, self.target_height);
        tokio::task::spawn_blocking(move || Self::extract_blocking(&location, timestamp_secs, w, h))
            .await
            .map_err(|e| SortiqError::extraction(format!("decode task failed: {}", e)))?
    }

    async fn release(&mut self) -> SortiqResult<()> {
        if let Some(current) = self.current.take() {
            if let Some(temp) = current.temp {
                std::fs::remove_file(&temp).map_err(|e| {
                    SortiqError::Cleanup(format!(
                        "could not remove staged source {}: {}",
                        temp.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

/// Parse a frame rate string like "30/1" or "24000/1001" into a float.
fn parse_frame_rate(rate_str: &str) -> f64 {
    if let Some((num_str, den_str)) = rate_str.split_once('/') {
        let num: f64 = num_str.parse().unwrap_or(30.0);
        let den: f64 = den_str.parse().unwrap_or(1.0);
        if den > 0.0 {
            num / den
        } else {
            30.0
        }
    } else {
        rate_str.parse::<f64>().unwrap_or(30.0)
    }
}
