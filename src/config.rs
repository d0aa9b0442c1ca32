use serde::{Deserialize, Serialize};
use std::fmt;

/// Options recognised by the note decoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DecodeConfig {
    /// Minimum amplitude of an onset activation to be considered an onset.
    pub onset_threshold: f32,
    /// Minimum amplitude of a frame activation for a note to remain "on".
    /// `None` derives the threshold from the frames matrix (mean + std).
    pub frame_threshold: Option<f32>,
    /// Minimum allowed note length, in frames.
    pub min_note_length: usize,
    /// Add onsets where the frame amplitudes jump sharply.
    pub infer_onsets: bool,
    /// Maximum allowed output frequency, in Hz.
    pub max_freq: Option<f32>,
    /// Minimum allowed output frequency, in Hz.
    pub min_freq: Option<f32>,
    /// Sweep residual frame energy for notes that lack an onset peak.
    pub melodia_trick: bool,
    /// Consecutive sub-threshold frames tolerated before a note ends.
    pub energy_tolerance: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            onset_threshold: 0.5,
            frame_threshold: Some(0.3),
            min_note_length: 5,
            infer_onsets: true,
            max_freq: None,
            min_freq: None,
            melodia_trick: true,
            energy_tolerance: 11,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub path: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl DecodeConfig {
    pub fn validate(&self) -> Result<(), ConfigIssue> {
        if !self.onset_threshold.is_finite() || !(0.0..=1.0).contains(&self.onset_threshold) {
            return Err(ConfigIssue::new("onset_threshold", "must be in [0, 1]"));
        }
        if let Some(thresh) = self.frame_threshold {
            if !thresh.is_finite() || !(0.0..=1.0).contains(&thresh) {
                return Err(ConfigIssue::new("frame_threshold", "must be in [0, 1]"));
            }
        }
        if self.min_note_length == 0 {
            return Err(ConfigIssue::new("min_note_length", "must be > 0"));
        }
        if self.energy_tolerance == 0 {
            return Err(ConfigIssue::new("energy_tolerance", "must be > 0"));
        }
        if let Some(max_freq) = self.max_freq {
            if !max_freq.is_finite() || max_freq <= 0.0 {
                return Err(ConfigIssue::new("max_freq", "must be > 0"));
            }
        }
        if let Some(min_freq) = self.min_freq {
            if !min_freq.is_finite() || min_freq <= 0.0 {
                return Err(ConfigIssue::new("min_freq", "must be > 0"));
            }
        }
        if let (Some(min_freq), Some(max_freq)) = (self.min_freq, self.max_freq) {
            if max_freq <= min_freq {
                return Err(ConfigIssue::new("max_freq", "must be > min_freq"));
            }
        }
        Ok(())
    }
}
