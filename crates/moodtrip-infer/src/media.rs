//! Raw media blobs, video frame sampling and audio analysis.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use moodtrip_core::{Error, Result};
use moodtrip_rules::AudioFeatures;
use tokio::process::Command;
use tracing::debug;

/// Bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl MediaBlob {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Decode either a `data:<mime>;base64,<payload>` URL or bare base64.
    /// Bare payloads take `default_mime`.
    pub fn from_base64(data: &str, default_mime: &str) -> Result<Self> {
        let data = data.trim();
        let (mime, payload) = match data.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| Error::InvalidInput("malformed data URL".into()))?;
                let mime = header.strip_suffix(";base64").unwrap_or(header);
                let mime = if mime.is_empty() { default_mime } else { mime };
                (mime, payload)
            }
            None => (default_mime, data),
        };
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::InvalidInput(format!("invalid base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(Error::InvalidInput("empty media payload".into()));
        }
        Ok(Self::new(mime, bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Picks one representative still image from a video.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    async fn representative_frame(&self, video: &MediaBlob) -> Result<MediaBlob>;
}

/// Extracts a JPEG frame with the `ffmpeg` binary.
///
/// The video is written to a scratch file because container formats like MP4
/// cannot always be demuxed from a pipe. Tries one second in, then the first frame.
pub struct FfmpegFrameSampler {
    binary: PathBuf,
    scratch_dir: PathBuf,
}

impl FfmpegFrameSampler {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Where the video is written for ffmpeg to read.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    async fn frame_at(&self, input: &Path, offset_secs: &str) -> Result<Vec<u8>> {
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-loglevel", "error", "-ss", offset_secs, "-i"])
            .arg(input)
            .args(["-frames:v", "1", "-f", "image2", "-vcodec", "mjpeg", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::ProviderUnavailable(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(Error::ProviderUnavailable(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Default for FfmpegFrameSampler {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn representative_frame(&self, video: &MediaBlob) -> Result<MediaBlob> {
        if video.is_empty() {
            return Err(Error::InvalidInput("empty video".into()));
        }

        // Removed on drop, including when the caller's timeout cancels us.
        let scratch = tempfile::Builder::new()
            .prefix("moodtrip-")
            .suffix(".video")
            .tempfile_in(&self.scratch_dir)?;
        tokio::fs::write(scratch.path(), &video.bytes).await?;

        let mut frame = Vec::new();
        let mut last_err = None;
        for offset in ["1", "0"] {
            match self.frame_at(scratch.path(), offset).await {
                Ok(bytes) if !bytes.is_empty() => {
                    frame = bytes;
                    break;
                }
                Ok(_) => debug!("ffmpeg produced no frame at {}s", offset),
                Err(e) => last_err = Some(e),
            }
        }
        drop(scratch);

        if frame.is_empty() {
            return Err(last_err
                .unwrap_or_else(|| Error::ProviderUnavailable("no frame could be extracted".into())));
        }
        Ok(MediaBlob::new("image/jpeg", frame))
    }
}

/// Turns an audio clip into an `AudioFeatures` record.
#[async_trait]
pub trait AudioAnalyzer: Send + Sync {
    async fn analyze(&self, audio: &MediaBlob) -> Result<AudioFeatures>;
}

/// No real signal analysis: every non-empty clip maps to the neutral record.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAudioAnalyzer;

#[async_trait]
impl AudioAnalyzer for HeuristicAudioAnalyzer {
    async fn analyze(&self, audio: &MediaBlob) -> Result<AudioFeatures> {
        if audio.is_empty() {
            return Err(Error::InvalidInput("empty audio".into()));
        }
        Ok(AudioFeatures::default())
    }
}
