//! Driver and end-to-end pipeline behaviour with a scripted engine.

use ndarray::{Array2, Array3};

use polypitch::constants::{
    ANNOT_N_FRAMES, AUDIO_N_SAMPLES, AUDIO_SAMPLE_RATE, N_FREQ_BINS_CONTOURS, N_FREQ_BINS_NOTES,
};
use polypitch::decode::scale::model_frame_to_time;
use polypitch::inference::driver::stream_inference;
use polypitch::{
    transcribe, AudioBuffer, DecodeConfig, Error, InferenceEngine, ModelOutput, OutputCollector,
};

/// Emits constant-valued activations, the value being the call index, so
/// tests can observe window ordering in the collected rows.
struct CountingEngine {
    calls: usize,
}

impl CountingEngine {
    fn new() -> Self {
        Self { calls: 0 }
    }
}

impl InferenceEngine for CountingEngine {
    fn run(&mut self, window: Array3<f32>) -> Result<ModelOutput, Error> {
        assert_eq!(window.shape(), &[1, AUDIO_N_SAMPLES, 1]);
        let value = self.calls as f32;
        self.calls += 1;
        Ok(ModelOutput {
            frames: Array2::from_elem((ANNOT_N_FRAMES, N_FREQ_BINS_NOTES), value),
            onsets: Array2::from_elem((ANNOT_N_FRAMES, N_FREQ_BINS_NOTES), value),
            contours: Array2::from_elem((ANNOT_N_FRAMES, N_FREQ_BINS_CONTOURS), value),
        })
    }
}

/// A sustained activation in one pitch bin, silent everywhere else.
struct SingleNoteEngine;

impl InferenceEngine for SingleNoteEngine {
    fn run(&mut self, _window: Array3<f32>) -> Result<ModelOutput, Error> {
        let mut frames = Array2::zeros((ANNOT_N_FRAMES, N_FREQ_BINS_NOTES));
        frames.column_mut(40).fill(0.9);
        Ok(ModelOutput {
            frames,
            onsets: Array2::zeros((ANNOT_N_FRAMES, N_FREQ_BINS_NOTES)),
            contours: Array2::zeros((ANNOT_N_FRAMES, N_FREQ_BINS_CONTOURS)),
        })
    }
}

struct BadShapeEngine;

impl InferenceEngine for BadShapeEngine {
    fn run(&mut self, _window: Array3<f32>) -> Result<ModelOutput, Error> {
        Ok(ModelOutput {
            frames: Array2::zeros((ANNOT_N_FRAMES, N_FREQ_BINS_NOTES)),
            onsets: Array2::zeros((ANNOT_N_FRAMES, N_FREQ_BINS_NOTES)),
            contours: Array2::zeros((ANNOT_N_FRAMES, 200)),
        })
    }
}

fn mono_buffer(seconds: usize) -> AudioBuffer {
    AudioBuffer {
        samples: vec![0.0; seconds * AUDIO_SAMPLE_RATE],
        sample_rate: AUDIO_SAMPLE_RATE as u32,
        channels: 1,
    }
}

#[test]
fn chunks_arrive_in_window_order_and_trim_to_audio_length() {
    let samples = vec![0.0f32; 3 * AUDIO_SAMPLE_RATE];
    let mut engine = CountingEngine::new();
    let mut collector = OutputCollector::new();
    let mut progress_log: Vec<f32> = vec![];
    let mut progress = |fraction: f32| progress_log.push(fraction);

    stream_inference(&mut engine, &samples, &mut collector, &mut progress)
        .expect("inference stream failed");

    // floor(66150 * 86 / 22050) frames from 2 windows of 142 trimmed rows
    let (frames, onsets, contours) = collector.into_matrices();
    assert_eq!(frames.len(), 258);
    assert_eq!(onsets.len(), 258);
    assert_eq!(contours.len(), 258);

    // window 0 fills the first 142 rows, window 1 the truncated remainder
    assert!(frames[..142].iter().all(|row| row.iter().all(|&v| v == 0.0)));
    assert!(frames[142..].iter().all(|row| row.iter().all(|&v| v == 1.0)));

    assert_eq!(progress_log, vec![0.0, 0.5, 1.0]);
    assert_eq!(engine.calls, 2);
}

#[test]
fn empty_audio_runs_no_inference_but_completes() {
    let mut engine = CountingEngine::new();
    let mut collector = OutputCollector::new();
    let mut progress_log: Vec<f32> = vec![];
    let mut progress = |fraction: f32| progress_log.push(fraction);

    stream_inference(&mut engine, &[], &mut collector, &mut progress)
        .expect("empty audio must not fail");

    assert_eq!(engine.calls, 0);
    let (frames, _, _) = collector.into_matrices();
    assert!(frames.is_empty());
    assert_eq!(progress_log.last(), Some(&1.0));
}

#[test]
fn empty_audio_transcribes_to_no_notes() {
    let audio = AudioBuffer {
        samples: vec![],
        sample_rate: AUDIO_SAMPLE_RATE as u32,
        channels: 1,
    };
    let mut engine = CountingEngine::new();
    let notes = transcribe(&audio, &DecodeConfig::default(), &mut engine)
        .expect("empty audio must transcribe cleanly");
    assert!(notes.is_empty());
}

#[test]
fn wrong_sample_rate_is_rejected() {
    let audio = AudioBuffer {
        samples: vec![0.0; 44100],
        sample_rate: 44100,
        channels: 1,
    };
    let mut engine = CountingEngine::new();
    let err = transcribe(&audio, &DecodeConfig::default(), &mut engine)
        .expect_err("44100 Hz must be rejected");
    assert!(matches!(err, Error::InvalidInput(_)), "{:?}", err);
    assert_eq!(engine.calls, 0);
}

#[test]
fn stereo_input_is_rejected() {
    let audio = AudioBuffer {
        samples: vec![0.0; AUDIO_SAMPLE_RATE],
        sample_rate: AUDIO_SAMPLE_RATE as u32,
        channels: 2,
    };
    let mut engine = CountingEngine::new();
    let err = transcribe(&audio, &DecodeConfig::default(), &mut engine)
        .expect_err("stereo must be rejected");
    assert!(matches!(err, Error::InvalidInput(_)), "{:?}", err);
}

#[test]
fn invalid_config_is_rejected_before_inference() {
    let config = DecodeConfig {
        onset_threshold: 2.0,
        ..DecodeConfig::default()
    };
    let mut engine = CountingEngine::new();
    let err = transcribe(&mono_buffer(1), &config, &mut engine)
        .expect_err("out-of-range threshold must be rejected");
    assert!(matches!(err, Error::InvalidInput(_)), "{:?}", err);
    assert_eq!(engine.calls, 0);
}

#[test]
fn output_shape_mismatch_is_fatal() {
    let mut engine = BadShapeEngine;
    let err = transcribe(&mono_buffer(1), &DecodeConfig::default(), &mut engine)
        .expect_err("contour width mismatch must be fatal");
    assert!(matches!(err, Error::Shape(_)), "{:?}", err);
}

#[test]
fn sustained_activation_becomes_one_timed_note() {
    let mut engine = SingleNoteEngine;
    let notes = transcribe(&mono_buffer(1), &DecodeConfig::default(), &mut engine)
        .expect("transcription failed");

    // one second of audio is 86 frames; the sustained column decodes to a
    // single note starting at frame 0
    assert_eq!(notes.len(), 1);
    let note = &notes[0];
    assert_eq!(note.pitch_midi, 61);
    assert_eq!(note.start_time_seconds, 0.0);
    let expected_duration = model_frame_to_time(84);
    assert!((note.duration_seconds - expected_duration).abs() < 1e-6);
    assert!((note.amplitude - 0.9).abs() < 1e-6);

    let bends = note.pitch_bends.as_ref().expect("bends attached");
    assert_eq!(bends.len(), 84);
}
