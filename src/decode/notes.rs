//! Polyphonic note decoding from frame and onset activation matrices.

use log::debug;

use crate::config::DecodeConfig;
use crate::constants::{MAX_FREQ_IDX, MIDI_OFFSET};

use super::events::NoteEventFrame;
use super::ops::{
    arg_max, arg_rel_max, global_max, max_axis0, mean_std_dev, min_axis0, where_greater_than,
};
use super::scale::hz_to_midi;

/// Zeroes all activation columns outside the `[min_freq, max_freq]` band,
/// in place, in both matrices. `None` leaves that side unconstrained.
pub fn constrain_frequency(
    onsets: &mut [Vec<f32>],
    frames: &mut [Vec<f32>],
    max_freq: Option<f32>,
    min_freq: Option<f32>,
) {
    if let Some(max_freq) = max_freq {
        let max_freq_idx = freq_to_bin(max_freq);
        for row in onsets.iter_mut().chain(frames.iter_mut()) {
            for value in row.iter_mut().skip(max_freq_idx) {
                *value = 0.0;
            }
        }
    }

    if let Some(min_freq) = min_freq {
        let min_freq_idx = freq_to_bin(min_freq);
        for row in onsets.iter_mut().chain(frames.iter_mut()) {
            for value in row.iter_mut().take(min_freq_idx) {
                *value = 0.0;
            }
        }
    }
}

/// Nearest activation column for a frequency, clipped below the piano range.
fn freq_to_bin(freq: f32) -> usize {
    (hz_to_midi(freq).round() as isize - MIDI_OFFSET as isize).max(0) as usize
}

/// Augments the onset matrix with onsets inferred from sharp jumps in frame
/// amplitude.
///
/// For each shift `n` in `1..=n_diff` the frames matrix is compared against
/// itself delayed by `n` rows; the element-wise minimum of those differences,
/// clamped to non-negative and rescaled to the global maximum of `onsets`,
/// is merged into `onsets` by element-wise maximum. The first `n_diff` rows
/// carry no usable difference and stay zero.
pub fn get_inferred_onsets(
    onsets: &[Vec<f32>],
    frames: &[Vec<f32>],
    n_diff: usize,
) -> Vec<Vec<f32>> {
    let diffs: Vec<Vec<Vec<f32>>> = (1..=n_diff)
        .map(|n| {
            frames
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    row.iter()
                        .enumerate()
                        .map(|(j, &value)| {
                            let delayed = if i >= n { frames[i - n][j] } else { 0.0 };
                            value - delayed
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    let mut frame_diff = min_axis0(&diffs);

    for row in frame_diff.iter_mut() {
        for value in row.iter_mut() {
            *value = value.max(0.0);
        }
    }

    for row in frame_diff.iter_mut().take(n_diff) {
        row.fill(0.0);
    }

    let onset_max = global_max(onsets);
    let frame_diff_max = global_max(&frame_diff);
    if frame_diff_max > 0.0 {
        for row in frame_diff.iter_mut() {
            for value in row.iter_mut() {
                *value = onset_max * *value / frame_diff_max;
            }
        }
    }

    max_axis0(&[onsets.to_vec(), frame_diff])
}

/// Coordinates of the largest element; ties resolve to the lowest row, then
/// the lowest column.
fn global_arg_max(matrix: &[Vec<f32>]) -> (usize, usize) {
    let mut best = (0, 0);
    for (row_idx, row) in matrix.iter().enumerate() {
        if let Some(col_idx) = arg_max(row) {
            if row[col_idx] > matrix[best.0][best.1] {
                best = (row_idx, col_idx);
            }
        }
    }
    best
}

/// Zeroes the energy cell at `(row, freq_idx)` together with its immediate
/// pitch neighbours, clipped to the valid bin range.
fn clear_energy(remaining_energy: &mut [Vec<f32>], row: usize, freq_idx: usize) {
    remaining_energy[row][freq_idx] = 0.0;
    if freq_idx < MAX_FREQ_IDX {
        remaining_energy[row][freq_idx + 1] = 0.0;
    }
    if freq_idx > 0 {
        remaining_energy[row][freq_idx - 1] = 0.0;
    }
}

/// Decodes raw model output into polyphonic note events, in frame indices.
///
/// Takes ownership of both matrices: the frequency-constraint step mutates
/// them, and the decoder keeps its own remaining-energy clone of `frames`.
///
/// # Arguments
///
/// * `frames` - Frame activation matrix (n_times, n_freqs).
/// * `onsets` - Onset activation matrix (n_times, n_freqs).
/// * `config` - Decoding thresholds and switches.
pub fn output_to_notes_poly(
    mut frames: Vec<Vec<f32>>,
    mut onsets: Vec<Vec<f32>>,
    config: &DecodeConfig,
) -> Vec<NoteEventFrame> {
    let n_frames = frames.len();
    if n_frames == 0 {
        return vec![];
    }

    let frame_thresh = match config.frame_threshold {
        Some(thresh) => thresh,
        None => {
            let (mean, std) = mean_std_dev(&frames);
            mean + std
        }
    };

    constrain_frequency(&mut onsets, &mut frames, config.max_freq, config.min_freq);

    let inferred_onsets = if config.infer_onsets {
        get_inferred_onsets(&onsets, &frames, 2)
    } else {
        onsets
    };

    let mut peak_matrix: Vec<Vec<f32>> = inferred_onsets
        .iter()
        .map(|row| vec![0.0; row.len()])
        .collect();
    for (row, col) in arg_rel_max(&inferred_onsets, 1) {
        peak_matrix[row][col] = inferred_onsets[row][col];
    }

    let (mut note_starts, mut freq_idxs) = where_greater_than(&peak_matrix, config.onset_threshold);
    debug!("{} onset candidates above threshold", note_starts.len());

    // Later onsets claim energy first.
    note_starts.reverse();
    freq_idxs.reverse();

    let mut remaining_energy = frames.clone();

    let mut note_events: Vec<NoteEventFrame> = note_starts
        .iter()
        .zip(freq_idxs.iter())
        .filter_map(|(&note_start, &freq_idx)| {
            // too close to the end of the audio
            if note_start >= n_frames - 1 {
                return None;
            }

            // walk forward until the energy stays below threshold for
            // energy_tolerance consecutive frames
            let mut i = note_start + 1;
            let mut k = 0;
            while i < n_frames - 1 && k < config.energy_tolerance {
                if remaining_energy[i][freq_idx] < frame_thresh {
                    k += 1;
                } else {
                    k = 0;
                }
                i += 1;
            }

            i -= k; // retreat to the last above-threshold frame

            if i - note_start <= config.min_note_length {
                return None;
            }

            for row in note_start..i {
                clear_energy(&mut remaining_energy, row, freq_idx);
            }

            let amplitude = frames[note_start..i]
                .iter()
                .map(|row| row[freq_idx])
                .sum::<f32>()
                / (i - note_start) as f32;

            Some(NoteEventFrame {
                start_frame: note_start,
                duration_frames: i - note_start,
                pitch_midi: freq_idx + MIDI_OFFSET,
                amplitude,
                pitch_bends: None,
            })
        })
        .collect();

    let onset_note_count = note_events.len();

    if config.melodia_trick {
        while global_max(&remaining_energy) > frame_thresh {
            let (i_mid, freq_idx) = global_arg_max(&remaining_energy);
            remaining_energy[i_mid][freq_idx] = 0.0;

            // forward pass
            let mut i = i_mid + 1;
            let mut k = 0;
            while i < n_frames - 1 && k < config.energy_tolerance {
                if remaining_energy[i][freq_idx] < frame_thresh {
                    k += 1;
                } else {
                    k = 0;
                }
                clear_energy(&mut remaining_energy, i, freq_idx);
                i += 1;
            }
            let i_end = i - 1 - k;

            // backward pass
            let mut i = i_mid as isize - 1;
            let mut k = 0;
            while i > 0 && k < config.energy_tolerance {
                let row = i as usize;
                if remaining_energy[row][freq_idx] < frame_thresh {
                    k += 1;
                } else {
                    k = 0;
                }
                clear_energy(&mut remaining_energy, row, freq_idx);
                i -= 1;
            }
            let i_start = i + 1 + k as isize;

            if i_start < 0 {
                panic!("melodia pass ran past the start of the matrix: i_start = {i_start}");
            }
            if i_end >= n_frames {
                panic!(
                    "melodia pass ran past the end of the matrix: i_end = {i_end}, frames = {n_frames}"
                );
            }
            let i_start = i_start as usize;

            if i_end - i_start <= config.min_note_length {
                // too short; the energy stays cleared
                continue;
            }

            let amplitude = frames[i_start..i_end]
                .iter()
                .map(|row| row[freq_idx])
                .sum::<f32>()
                / (i_end - i_start) as f32;

            note_events.push(NoteEventFrame {
                start_frame: i_start,
                duration_frames: i_end - i_start,
                pitch_midi: freq_idx + MIDI_OFFSET,
                amplitude,
                pitch_bends: None,
            });
        }
        debug!(
            "melodia pass added {} notes to {} onset notes",
            note_events.len() - onset_note_count,
            onset_note_count
        );
    }

    note_events
}
