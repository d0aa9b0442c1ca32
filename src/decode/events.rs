use serde::Serialize;

use super::scale::model_frame_to_time;

/// A note event expressed in model frame indices.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEventFrame {
    pub start_frame: usize,
    pub duration_frames: usize,
    pub pitch_midi: usize,
    pub amplitude: f32,
    /// Per-frame pitch deviation in contour bins, one entry per frame.
    pub pitch_bends: Option<Vec<i32>>,
}

/// A note event expressed in seconds, as delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEventTime {
    pub start_time_seconds: f32,
    pub duration_seconds: f32,
    pub pitch_midi: usize,
    pub amplitude: f32,
    pub pitch_bends: Option<Vec<i32>>,
}

/// Maps frame-indexed note events onto the audio timeline.
pub fn note_frames_to_time(notes: &[NoteEventFrame]) -> Vec<NoteEventTime> {
    notes
        .iter()
        .map(|note| {
            let start = model_frame_to_time(note.start_frame);
            let end = model_frame_to_time(note.start_frame + note.duration_frames);
            NoteEventTime {
                start_time_seconds: start,
                duration_seconds: end - start,
                pitch_midi: note.pitch_midi,
                amplitude: note.amplitude,
                pitch_bends: note.pitch_bends.clone(),
            }
        })
        .collect()
}
