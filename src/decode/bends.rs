//! Fractional-pitch refinement: per-note pitch-bend curves from the contour
//! matrix.

use crate::constants::{N_FREQ_BINS_CONTOURS, PITCH_BEND_BINS_TOLERANCE};

use super::events::NoteEventFrame;
use super::ops::{arg_max, gaussian};
use super::scale::midi_pitch_to_contour_bin;

const GAUSSIAN_STD: f32 = 5.0;

/// Attaches a per-frame pitch-bend curve to each note.
///
/// For every frame of a note, the contour row is windowed around the note's
/// nominal contour bin (`n_bins_tolerance` bins each side, clipped to the
/// matrix), weighted by a Gaussian centred on the nominal bin, and the argmax
/// offset becomes that frame's bend in contour-bin units.
pub fn add_pitch_bends(
    contours: &[Vec<f32>],
    notes: &[NoteEventFrame],
    n_bins_tolerance: usize,
) -> Vec<NoteEventFrame> {
    let window_length = n_bins_tolerance * 2 + 1;
    let freq_gaussian = gaussian(window_length, GAUSSIAN_STD);

    notes
        .iter()
        .map(|note| {
            let freq_idx = midi_pitch_to_contour_bin(note.pitch_midi as f32).round() as usize;
            let freq_start = freq_idx.saturating_sub(n_bins_tolerance);
            let freq_end = (freq_idx + n_bins_tolerance + 1).min(N_FREQ_BINS_CONTOURS);

            // clip the Gaussian the same way the window was clipped
            let gauss_start = n_bins_tolerance.saturating_sub(freq_idx);
            let gauss_end = window_length
                - freq_idx.saturating_sub(N_FREQ_BINS_CONTOURS - n_bins_tolerance - 1);
            let gaussian_window = &freq_gaussian[gauss_start..gauss_end];

            // a left-clipped window shifts the argmax origin
            let pb_shift = n_bins_tolerance - n_bins_tolerance.saturating_sub(freq_idx);

            let bends: Vec<i32> = contours
                [note.start_frame..note.start_frame + note.duration_frames]
                .iter()
                .filter_map(|row| {
                    let weighted: Vec<f32> = row[freq_start..freq_end]
                        .iter()
                        .zip(gaussian_window.iter())
                        .map(|(&value, &weight)| value * weight)
                        .collect();
                    arg_max(&weighted).map(|idx| idx as i32 - pb_shift as i32)
                })
                .collect();

            NoteEventFrame {
                pitch_bends: Some(bends),
                ..note.clone()
            }
        })
        .collect()
}
