//! Karaokify - Karaoke Video Pipeline
//!
//! Turns a mixed song into a karaoke video: the track is split into vocal and
//! instrumental stems with demucs, the vocals are transcribed with whisper,
//! and the lyrics are burned as timed subtitles onto a blurred background
//! with ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod paths;
pub mod process;
pub mod progress;
pub mod separate;
pub mod subtitle;
pub mod thumbnail;
pub mod transcribe;
pub mod vocals;
pub mod workflow;
