//! Slices a mono signal into the fixed-length overlapping windows the model
//! consumes.

use ndarray::{s, Array1};

use crate::constants::{AUDIO_N_SAMPLES, HOP_SIZE, OVERLAP_LENGTH};

/// Left-pads the signal with half the overlap length so the first window's
/// trimmed output starts at the true beginning of the audio.
pub fn pad_signal(samples: &[f32]) -> Array1<f32> {
    let mut padded = vec![0.0; OVERLAP_LENGTH / 2];
    padded.extend_from_slice(samples);
    Array1::from(padded)
}

/// Number of windows produced for a padded signal of the given length.
pub fn n_windows(padded_len: usize) -> usize {
    (padded_len + HOP_SIZE - 1) / HOP_SIZE
}

pub struct WindowedAudio<'a> {
    audio: &'a Array1<f32>,
    index: usize,
}

impl<'a> Iterator for WindowedAudio<'a> {
    type Item = Array1<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.audio.len() {
            return None;
        }

        let end_index = (self.index + AUDIO_N_SAMPLES).min(self.audio.len());
        let mut window = self.audio.slice(s![self.index..end_index]).to_vec();
        window.resize(AUDIO_N_SAMPLES, 0.0);

        self.index += HOP_SIZE;
        Some(Array1::from(window))
    }
}

/// Windows of `AUDIO_N_SAMPLES` samples at `HOP_SIZE` stride, the final
/// window zero-padded to full length.
pub fn window_signal(audio: &Array1<f32>) -> WindowedAudio {
    WindowedAudio { audio, index: 0 }
}
