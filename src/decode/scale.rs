//! Pitch and time scale conversions shared by the decoder.

use crate::constants::{
    ANNOTATIONS_BASE_FREQUENCY, ANNOT_N_FRAMES, AUDIO_SAMPLE_RATE, CONTOURS_BINS_PER_SEMITONE,
    FFT_HOP, WINDOW_OFFSET,
};

/// Converts a frequency in Hz to the corresponding MIDI pitch.
pub fn hz_to_midi(hz: f32) -> f32 {
    12.0 * (hz.log2() - 440.0f32.log2()) + 69.0
}

/// Converts a MIDI pitch to the corresponding frequency in Hz.
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * 2.0f32.powf((midi - 69.0) / 12.0)
}

/// Converts a MIDI pitch to its (fractional) contour bin.
pub fn midi_pitch_to_contour_bin(pitch_midi: f32) -> f32 {
    12.0 * CONTOURS_BINS_PER_SEMITONE
        * (midi_to_hz(pitch_midi) / ANNOTATIONS_BASE_FREQUENCY).log2()
}

/// Converts a model frame index to seconds.
///
/// Each analysis window contributes `ANNOT_N_FRAMES` frames; the subtracted
/// term compensates for the overlap trimmed between windows.
pub fn model_frame_to_time(frame: usize) -> f32 {
    (frame as f32 * FFT_HOP as f32) / AUDIO_SAMPLE_RATE as f32
        - WINDOW_OFFSET * (frame as f32 / ANNOT_N_FRAMES as f32).floor()
}
