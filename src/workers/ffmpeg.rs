use std::path::PathBuf;
use std::process::Stdio;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use super::transcoder::{TranscodeError, TranscodeRequest, Transcoder};

/// Encoder settings handed verbatim to ffmpeg for every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeProfile {
    pub video_codec: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub frame_rate: u32,
    /// Output height; width follows the aspect ratio, rounded to an even number.
    pub height: u32,
    pub preset: String,
    pub crf: u8,
    pub video_bitrate: Option<String>,
    pub max_rate: Option<String>,
    pub buffer_size: Option<String>,
    pub pixel_format: String,
    pub profile: String,
    pub level: String,
    /// Moves the moov atom to the front so playback can start before download ends.
    pub faststart: bool,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            frame_rate: 30,
            height: 720,
            preset: "veryfast".to_string(),
            crf: 23,
            video_bitrate: None,
            max_rate: None,
            buffer_size: None,
            pixel_format: "yuv420p".to_string(),
            profile: "main".to_string(),
            level: "3.1".to_string(),
            faststart: true,
        }
    }
}

/// Build FFmpeg arguments for a single conversion
pub fn build_ffmpeg_args(request: &TranscodeRequest) -> Vec<String> {
    let profile = &request.profile;

    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-nostdin".to_string(),
        "-i".to_string(),
        request.input.to_string_lossy().into_owned(),
        "-c:v".to_string(),
        profile.video_codec.clone(),
        "-c:a".to_string(),
        profile.audio_codec.clone(),
        "-b:a".to_string(),
        profile.audio_bitrate.clone(),
        "-r".to_string(),
        profile.frame_rate.to_string(),
        "-vf".to_string(),
        format!("scale=-2:{}", profile.height),
        "-preset".to_string(),
        profile.preset.clone(),
        "-crf".to_string(),
        profile.crf.to_string(),
    ];

    if let Some(bitrate) = &profile.video_bitrate {
        args.extend(["-b:v".to_string(), bitrate.clone()]);
    }
    if let Some(max_rate) = &profile.max_rate {
        args.extend(["-maxrate".to_string(), max_rate.clone()]);
    }
    if let Some(buffer_size) = &profile.buffer_size {
        args.extend(["-bufsize".to_string(), buffer_size.clone()]);
    }

    args.extend([
        "-pix_fmt".to_string(),
        profile.pixel_format.clone(),
        "-profile:v".to_string(),
        profile.profile.clone(),
        "-level".to_string(),
        profile.level.clone(),
    ]);

    if profile.faststart {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }

    args.push(request.output.to_string_lossy().into_owned());
    args
}

/// Keeps the last few lines of ffmpeg's stderr for error reporting.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().rev().take(5).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns whether the configured binary answers `-version`.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|s| s.success())
    }

    async fn run(binary: PathBuf, request: TranscodeRequest) -> Result<(), TranscodeError> {
        let args = build_ffmpeg_args(&request);
        debug!("ffmpeg {}", args.join(" "));

        let output = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(TranscodeError::Spawn)?;

        if !output.status.success() {
            return Err(TranscodeError::Exit {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        match tokio::fs::metadata(&request.output).await {
            Ok(meta) if meta.len() > 0 => {
                info!("Created {} ({} bytes)", request.output.display(), meta.len());
                Ok(())
            }
            _ => Err(TranscodeError::MissingOutput(request.output)),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, request: TranscodeRequest) -> BoxFuture<'static, Result<(), TranscodeError>> {
        Box::pin(Self::run(self.binary.clone(), request))
    }
}
