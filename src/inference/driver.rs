//! Walks the audio windows through the model and streams un-overlapped
//! activation rows, in window order, to a sink.

use log::debug;
use ndarray::{s, Array2, Axis};

use crate::audio::window::{n_windows, pad_signal, window_signal};
use crate::constants::{
    ANNOTATIONS_FPS, ANNOT_N_FRAMES, AUDIO_SAMPLE_RATE, N_FREQ_BINS_CONTOURS, N_FREQ_BINS_NOTES,
    N_OVERLAPPING_FRAMES, OVERLAP_LENGTH,
};
use crate::Error;

use super::engine::{InferenceEngine, ModelOutput};

/// A run of consecutive activation rows, already trimmed of window overlap.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    pub frames: Array2<f32>,
    pub onsets: Array2<f32>,
    pub contours: Array2<f32>,
}

/// Receives chunks strictly in window order, never concurrently.
pub trait ChunkSink {
    fn on_chunk(&mut self, chunk: OutputChunk);
}

/// Receives inference progress as a fraction in `0.0..=1.0`.
pub trait ProgressSink {
    fn on_progress(&mut self, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: FnMut(f32),
{
    fn on_progress(&mut self, fraction: f32) {
        self(fraction)
    }
}

/// Concatenates streamed chunks into the aligned full-length matrices the
/// decoder consumes.
#[derive(Debug, Default)]
pub struct OutputCollector {
    frames: Vec<Vec<f32>>,
    onsets: Vec<Vec<f32>>,
    contours: Vec<Vec<f32>>,
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_matrices(self) -> (Vec<Vec<f32>>, Vec<Vec<f32>>, Vec<Vec<f32>>) {
        (self.frames, self.onsets, self.contours)
    }
}

impl ChunkSink for OutputCollector {
    fn on_chunk(&mut self, chunk: OutputChunk) {
        self.frames
            .extend(chunk.frames.outer_iter().map(|row| row.to_vec()));
        self.onsets
            .extend(chunk.onsets.outer_iter().map(|row| row.to_vec()));
        self.contours
            .extend(chunk.contours.outer_iter().map(|row| row.to_vec()));
    }
}

/// Runs the model over every window of `samples` and streams trimmed
/// activation rows to `sink`.
///
/// The total number of emitted rows is capped at the frame count implied by
/// the original audio length; the chunk that crosses the cap is truncated
/// and any later windows are skipped. Progress is reported as `i / W` before
/// each window and `1.0` on completion. An engine error aborts the walk and
/// propagates unchanged.
pub fn stream_inference(
    engine: &mut dyn InferenceEngine,
    samples: &[f32],
    sink: &mut dyn ChunkSink,
    progress: &mut dyn ProgressSink,
) -> Result<(), Error> {
    if OVERLAP_LENGTH % 2 != 0 {
        return Err(Error::InvalidInput(format!(
            "overlap length {} must be even",
            OVERLAP_LENGTH
        )));
    }
    let n_overlap_half = N_OVERLAPPING_FRAMES / 2;

    let n_output_frames_original = (samples.len() as f32
        * (ANNOTATIONS_FPS as f32 / AUDIO_SAMPLE_RATE as f32))
        .floor() as usize;

    let padded = pad_signal(samples);
    let total_windows = n_windows(padded.len());
    let mut emitted = 0usize;

    for (i, window) in window_signal(&padded).enumerate() {
        progress.on_progress(i as f32 / total_windows as f32);
        if emitted >= n_output_frames_original {
            break;
        }

        let window = window.insert_axis(Axis(0)).insert_axis(Axis(2));
        let output = engine.run(window)?;
        validate_shapes(&output)?;

        let limit = n_output_frames_original - emitted;
        let chunk = unwrap_chunk(output, n_overlap_half, limit);
        emitted += chunk.frames.len_of(Axis(0));
        debug!(
            "window {}/{}: {} rows emitted ({} total)",
            i + 1,
            total_windows,
            chunk.frames.len_of(Axis(0)),
            emitted
        );
        sink.on_chunk(chunk);
    }

    progress.on_progress(1.0);
    Ok(())
}

/// Drops the overlap guard rows from each side of the window's output and
/// truncates to at most `limit` rows.
fn unwrap_chunk(output: ModelOutput, n_overlap_half: usize, limit: usize) -> OutputChunk {
    OutputChunk {
        frames: trim_rows(output.frames, n_overlap_half, limit),
        onsets: trim_rows(output.onsets, n_overlap_half, limit),
        contours: trim_rows(output.contours, n_overlap_half, limit),
    }
}

fn trim_rows(matrix: Array2<f32>, n_overlap_half: usize, limit: usize) -> Array2<f32> {
    let kept = matrix.len_of(Axis(0)) - 2 * n_overlap_half;
    let take = kept.min(limit);
    matrix
        .slice(s![n_overlap_half..n_overlap_half + take, ..])
        .to_owned()
}

fn validate_shapes(output: &ModelOutput) -> Result<(), Error> {
    check_shape(&output.frames, N_FREQ_BINS_NOTES, "frames")?;
    check_shape(&output.onsets, N_FREQ_BINS_NOTES, "onsets")?;
    check_shape(&output.contours, N_FREQ_BINS_CONTOURS, "contours")?;
    Ok(())
}

fn check_shape(matrix: &Array2<f32>, expected_cols: usize, name: &str) -> Result<(), Error> {
    let shape = matrix.shape();
    if shape != [ANNOT_N_FRAMES, expected_cols] {
        return Err(Error::Shape(format!(
            "{} output has shape {:?}, expected ({}, {})",
            name, shape, ANNOT_N_FRAMES, expected_cols
        )));
    }
    Ok(())
}
