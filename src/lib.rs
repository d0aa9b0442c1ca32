//! Polyphonic note decoding for neural music transcription.
//!
//! Feeds 22050 Hz mono audio through an opaque activation model, decodes the
//! resulting frame/onset/contour matrices into note events with per-frame
//! pitch bends, and serialises them to MIDI.

use log::info;
use thiserror::Error as ThisError;

pub mod constants;

pub mod config;

pub mod audio {
    pub mod loader;
    pub mod window;
}

pub mod inference {
    pub mod driver;
    pub mod engine;
}

pub mod decode {
    pub mod bends;
    pub mod events;
    pub mod notes;
    pub mod ops;
    pub mod scale;
}

pub mod midi;

pub use config::DecodeConfig;
pub use decode::events::{NoteEventFrame, NoteEventTime};
pub use inference::driver::{ChunkSink, OutputChunk, OutputCollector, ProgressSink};
pub use inference::engine::{InferenceEngine, ModelOutput, OrtEngine};

use constants::{AUDIO_SAMPLE_RATE, PITCH_BEND_BINS_TOLERANCE};
use decode::bends::add_pitch_bends;
use decode::events::note_frames_to_time;
use decode::notes::output_to_notes_poly;
use inference::driver::stream_inference;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("unexpected model output shape: {0}")]
    Shape(String),
    #[error("io error: {0}")]
    Io(String),
}

/// Mono audio at the core's fixed sample rate.
///
/// The transcription entry points reject any buffer that is not 22050 Hz
/// single-channel; resampling and down-mixing belong to the caller (or the
/// [`audio::loader`] adapter).
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Transcribes audio to time-indexed note events.
pub fn transcribe(
    audio: &AudioBuffer,
    config: &DecodeConfig,
    engine: &mut dyn InferenceEngine,
) -> Result<Vec<NoteEventTime>, Error> {
    transcribe_with_progress(audio, config, engine, None)
}

/// Transcribes audio to note events, reporting inference progress.
pub fn transcribe_with_progress(
    audio: &AudioBuffer,
    config: &DecodeConfig,
    engine: &mut dyn InferenceEngine,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<Vec<NoteEventTime>, Error> {
    config
        .validate()
        .map_err(|issue| Error::InvalidInput(issue.to_string()))?;
    if audio.sample_rate != AUDIO_SAMPLE_RATE as u32 {
        return Err(Error::InvalidInput(format!(
            "expected {} Hz audio, got {} Hz",
            AUDIO_SAMPLE_RATE, audio.sample_rate
        )));
    }
    if audio.channels != 1 {
        return Err(Error::InvalidInput(format!(
            "expected mono audio, got {} channels",
            audio.channels
        )));
    }

    let mut noop = NoopProgressSink;
    let progress: &mut dyn ProgressSink = match progress {
        Some(sink) => sink,
        None => &mut noop,
    };

    let mut collector = OutputCollector::new();
    stream_inference(engine, &audio.samples, &mut collector, progress)?;
    let (frames, onsets, contours) = collector.into_matrices();

    let notes = output_to_notes_poly(frames, onsets, config);
    let notes = add_pitch_bends(&contours, &notes, PITCH_BEND_BINS_TOLERANCE);
    info!("decoded {} notes", notes.len());

    Ok(note_frames_to_time(&notes))
}

struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&mut self, _fraction: f32) {}
}
