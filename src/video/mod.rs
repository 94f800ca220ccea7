//! Video encoding through an FFmpeg subprocess.
//!
//! Provides:
//! - Raw `rgb24` frame streaming over the encoder's standard input
//! - Hardware encoder selection (VideoToolbox, NVENC, Quick Sync) with a
//!   libx264 fallback
//! - A diagnostic drain thread so the encoder can never block on its output
//! - Bounded, idempotent teardown for cancellation and failures

pub mod diagnostics;
pub mod encoder;

pub use diagnostics::{DiagnosticDrain, DIAGNOSTIC_TAIL_BYTES};
pub use encoder::{
    build_args, probe_encoders, EncodeError, EncodeJob, EncodeTarget, EncoderSettings, VideoCodec,
};
