// Audio windowing
pub const AUDIO_SAMPLE_RATE: usize = 22050;
pub const FFT_HOP: usize = 256;
pub const ANNOTATIONS_FPS: usize = AUDIO_SAMPLE_RATE / FFT_HOP; // floor division
pub const AUDIO_WINDOW_LENGTH: usize = 2;
pub const AUDIO_N_SAMPLES: usize = AUDIO_SAMPLE_RATE * AUDIO_WINDOW_LENGTH - FFT_HOP;
pub const N_OVERLAPPING_FRAMES: usize = 30;
// Must stay even: half of it is trimmed from each side of every model output.
pub const OVERLAP_LENGTH: usize = N_OVERLAPPING_FRAMES * FFT_HOP;
pub const HOP_SIZE: usize = AUDIO_N_SAMPLES - OVERLAP_LENGTH;

// Pitch grid
pub const MIDI_OFFSET: usize = 21;
pub const MAX_FREQ_IDX: usize = 87;
pub const ANNOT_N_FRAMES: usize = ANNOTATIONS_FPS * AUDIO_WINDOW_LENGTH;
pub const N_FREQ_BINS_NOTES: usize = 88;
pub const CONTOURS_BINS_PER_SEMITONE: f32 = 3.0;
pub const ANNOTATIONS_BASE_FREQUENCY: f32 = 27.5; // lowest key on a piano
pub const ANNOTATIONS_N_SEMITONES: f32 = 88.0; // number of piano keys
pub const N_FREQ_BINS_CONTOURS: usize =
    (ANNOTATIONS_N_SEMITONES * CONTOURS_BINS_PER_SEMITONE) as usize;

// Pitch-bend refinement searches this many contour bins either side of a
// note's nominal bin.
pub const PITCH_BEND_BINS_TOLERANCE: usize = 25;

// The trailing 0.0018 is a magic alignment correction; emitted note times
// depend on it, so it must not be re-derived.
pub const WINDOW_OFFSET: f32 = (FFT_HOP as f32 / AUDIO_SAMPLE_RATE as f32)
    * (ANNOT_N_FRAMES as f32 - AUDIO_N_SAMPLES as f32 / FFT_HOP as f32)
    + 0.0018;

// MIDI output
pub const TICKS_PER_BEAT: u16 = 480;
pub const DEFAULT_TEMPO_BPM: u32 = 120;
