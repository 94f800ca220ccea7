//! Streaming encoder subprocess.
//!
//! Frames are piped as raw `rgb24` into an FFmpeg child process which encodes
//! them with a (preferably hardware) H.264 encoder and muxes the source audio.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::diagnostics::DiagnosticDrain;

/// How often teardown polls the child while waiting for it to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// H.264 encoder implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    /// Apple VideoToolbox.
    VideoToolbox,
    /// NVIDIA NVENC.
    Nvenc,
    /// Intel Quick Sync.
    Qsv,
    /// libx264 on the CPU.
    Software,
}

impl VideoCodec {
    /// All codecs in order of preference.
    pub const ALL: [VideoCodec; 4] = [
        VideoCodec::VideoToolbox,
        VideoCodec::Nvenc,
        VideoCodec::Qsv,
        VideoCodec::Software,
    ];

    /// FFmpeg encoder name.
    pub fn encoder_name(&self) -> &'static str {
        match self {
            VideoCodec::VideoToolbox => "h264_videotoolbox",
            VideoCodec::Nvenc => "h264_nvenc",
            VideoCodec::Qsv => "h264_qsv",
            VideoCodec::Software => "libx264",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, VideoCodec::Software)
    }

    /// The most preferred codec in `available`, software when none match.
    pub fn auto_select(available: &[VideoCodec]) -> VideoCodec {
        Self::ALL
            .into_iter()
            .find(|codec| available.contains(codec))
            .unwrap_or(VideoCodec::Software)
    }
}

impl Default for VideoCodec {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            VideoCodec::VideoToolbox
        } else {
            VideoCodec::Software
        }
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.encoder_name())
    }
}

/// Encoder process settings shared by every render.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    /// Encoder executable, looked up on `PATH` when not absolute.
    pub program: PathBuf,
    pub codec: VideoCodec,
    pub video_bitrate: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// How long teardown waits for the encoder to exit before killing it.
    pub grace_timeout: Duration,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            codec: VideoCodec::default(),
            video_bitrate: "8M".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            grace_timeout: Duration::from_secs(5),
        }
    }
}

/// What one encode produces.
#[derive(Debug, Clone)]
pub struct EncodeTarget {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Audio muxed into the output.
    pub audio_path: PathBuf,
    /// Output length limit in seconds.
    pub duration: f64,
    pub output: PathBuf,
}

impl EncodeTarget {
    /// Bytes in one `rgb24` frame.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Errors that can occur while encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Encoder '{program}' not found; is FFmpeg installed and on PATH?")]
    EncoderNotFound { program: String },
    #[error("Failed to start encoder: {0}")]
    SpawnFailed(#[source] io::Error),
    #[error("Failed to write frame to encoder: {source}")]
    WriteFailed {
        #[source]
        source: io::Error,
        /// Diagnostic tail collected after the encoder went away.
        diagnostics: String,
    },
    #[error("Encoder exited with {status}: {diagnostics}")]
    ExitedNonZero { status: ExitStatus, diagnostics: String },
    #[error("Failed to wait for encoder: {0}")]
    Wait(#[source] io::Error),
    #[error("Frame size mismatch: expected {expected} bytes, got {got}")]
    FrameSize { expected: usize, got: usize },
}

/// Full FFmpeg argument list for `target`.
pub fn build_args(settings: &EncoderSettings, target: &EncodeTarget) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-f",
        "rawvideo",
        "-vcodec",
        "rawvideo",
        "-s",
        format!("{}x{}", target.width, target.height).as_str(),
        "-pix_fmt",
        "rgb24",
        "-r",
        target.fps.to_string().as_str(),
        "-i",
        "-",
        "-i",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push(target.audio_path.clone().into_os_string());
    args.extend(
        [
            "-c:v",
            settings.codec.encoder_name(),
            "-b:v",
            settings.video_bitrate.as_str(),
            "-c:a",
            settings.audio_codec.as_str(),
            "-b:a",
            settings.audio_bitrate.as_str(),
            "-shortest",
            "-t",
            format!("{:.3}", target.duration).as_str(),
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(target.output.clone().into_os_string());
    args
}

fn spawn_error(program: &Path, e: io::Error) -> EncodeError {
    if e.kind() == io::ErrorKind::NotFound {
        EncodeError::EncoderNotFound {
            program: program.display().to_string(),
        }
    } else {
        EncodeError::SpawnFailed(e)
    }
}

/// A running encoder process.
///
/// Dropping the job tears the process down, so no child outlives it.
pub struct EncodeJob {
    child: Child,
    stdin: Option<ChildStdin>,
    drain: DiagnosticDrain,
    frame_bytes: usize,
    frames_written: usize,
    grace_timeout: Duration,
    exit_status: Option<ExitStatus>,
}

impl EncodeJob {
    /// Start the encoder and its diagnostic drain.
    pub fn spawn(settings: &EncoderSettings, target: &EncodeTarget) -> Result<Self, EncodeError> {
        let args = build_args(settings, target);
        log::debug!(
            "Starting encoder: {} {}",
            settings.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&settings.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&settings.program, e))?;

        let stdin = child.stdin.take();
        let drain = match child.stderr.take().map(DiagnosticDrain::spawn) {
            Some(Ok(drain)) => drain,
            Some(Err(e)) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EncodeError::SpawnFailed(e));
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EncodeError::SpawnFailed(io::Error::other(
                    "encoder diagnostic pipe unavailable",
                )));
            }
        };
        if stdin.is_none() {
            let mut job = Self::assemble(child, None, drain, settings, target);
            job.teardown();
            return Err(EncodeError::SpawnFailed(io::Error::other("encoder input pipe unavailable")));
        }

        Ok(Self::assemble(child, stdin, drain, settings, target))
    }

    fn assemble(
        child: Child,
        stdin: Option<ChildStdin>,
        drain: DiagnosticDrain,
        settings: &EncoderSettings,
        target: &EncodeTarget,
    ) -> Self {
        Self {
            child,
            stdin,
            drain,
            frame_bytes: target.frame_bytes(),
            frames_written: 0,
            grace_timeout: settings.grace_timeout,
            exit_status: None,
        }
    }

    /// OS process id of the encoder.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Write one frame; blocks while the encoder's input pipe is full.
    ///
    /// On failure the encoder is torn down and its diagnostic tail attached.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<(), EncodeError> {
        if frame.len() != self.frame_bytes {
            return Err(EncodeError::FrameSize {
                expected: self.frame_bytes,
                got: frame.len(),
            });
        }

        let result = match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(frame),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "encoder input already closed")),
        };

        match result {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(source) => {
                self.teardown();
                Err(EncodeError::WriteFailed {
                    source,
                    diagnostics: self.drain.tail(),
                })
            }
        }
    }

    /// Close the input, wait for the encoder to exit and check its status.
    pub fn finish(mut self) -> Result<(), EncodeError> {
        drop(self.stdin.take());

        let status = match self.child.wait() {
            Ok(status) => status,
            Err(e) => {
                self.teardown();
                return Err(EncodeError::Wait(e));
            }
        };
        self.exit_status = Some(status);
        let diagnostics = self.drain.join();

        if status.success() {
            log::debug!("Encoder finished after {} frames", self.frames_written);
            Ok(())
        } else {
            Err(EncodeError::ExitedNonZero { status, diagnostics })
        }
    }

    /// Stop the encoder and release every handle.
    ///
    /// Closes the input, gives the encoder `grace_timeout` to exit on its own,
    /// kills it otherwise, then joins the diagnostic thread. Safe to call any
    /// number of times; returns the exit status when one was observed.
    ///
    /// Closing stdin is the only termination request sent. FFmpeg treats it
    /// as end of stream and finalises the file; an encoder that ignores EOF
    /// always costs the full `grace_timeout` before it is killed.
    pub fn teardown(&mut self) -> Option<ExitStatus> {
        if self.exit_status.is_some() && self.drain.is_joined() {
            return self.exit_status;
        }
        drop(self.stdin.take());

        if self.exit_status.is_none() {
            self.exit_status = self.wait_or_kill();
        }
        self.drain.join();
        self.exit_status
    }

    fn wait_or_kill(&mut self) -> Option<ExitStatus> {
        let deadline = Instant::now() + self.grace_timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL_INTERVAL),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Failed to poll encoder: {}", e);
                    break;
                }
            }
        }

        log::warn!("Encoder did not exit within {:?}, killing it", self.grace_timeout);
        if let Err(e) = self.child.kill() {
            log::warn!("Failed to kill encoder: {}", e);
        }
        match self.child.wait() {
            Ok(status) => Some(status),
            Err(e) => {
                log::error!("Failed to reap encoder: {}", e);
                None
            }
        }
    }
}

impl Drop for EncodeJob {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Which codecs `program` reports in `-encoders`.
pub fn probe_encoders(program: &Path) -> Result<Vec<VideoCodec>, EncodeError> {
    let output = Command::new(program)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    Ok(parse_encoder_list(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_encoder_list(listing: &str) -> Vec<VideoCodec> {
    VideoCodec::ALL
        .into_iter()
        .filter(|codec| {
            listing
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(codec.encoder_name()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> EncodeTarget {
        EncodeTarget {
            width: 640,
            height: 360,
            fps: 30,
            audio_path: PathBuf::from("song.wav"),
            duration: 5.0,
            output: PathBuf::from("out.mp4"),
        }
    }

    #[test]
    fn test_build_args() {
        let settings = EncoderSettings {
            codec: VideoCodec::VideoToolbox,
            ..EncoderSettings::default()
        };
        let args: Vec<String> = build_args(&settings, &target())
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-y", "-f", "rawvideo", "-vcodec", "rawvideo", "-s", "640x360", "-pix_fmt", "rgb24",
                "-r", "30", "-i", "-", "-i", "song.wav", "-c:v", "h264_videotoolbox", "-b:v", "8M",
                "-c:a", "aac", "-b:a", "192k", "-shortest", "-t", "5.000", "out.mp4",
            ]
        );
    }

    #[test]
    fn test_frame_bytes() {
        assert_eq!(target().frame_bytes(), 640 * 360 * 3);
    }

    #[test]
    fn test_auto_select_prefers_hardware() {
        assert_eq!(VideoCodec::auto_select(&[]), VideoCodec::Software);
        assert_eq!(
            VideoCodec::auto_select(&[VideoCodec::Software, VideoCodec::Qsv, VideoCodec::Nvenc]),
            VideoCodec::Nvenc
        );
    }

    #[test]
    fn test_parse_encoder_list() {
        let listing = "Encoders:\n V....D libx264              libx264 H.264\n V....D h264_nvenc           NVIDIA NVENC H.264 encoder\n";
        assert_eq!(parse_encoder_list(listing), vec![VideoCodec::Nvenc, VideoCodec::Software]);
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let settings = EncoderSettings {
            program: PathBuf::from("/nonexistent/psyviz-encoder"),
            ..EncoderSettings::default()
        };
        match EncodeJob::spawn(&settings, &target()) {
            Err(EncodeError::EncoderNotFound { program }) => {
                assert_eq!(program, "/nonexistent/psyviz-encoder")
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("spawn should fail"),
        }
    }
}
