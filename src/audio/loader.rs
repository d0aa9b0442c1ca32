//! WAV loading adapter: decodes, down-mixes and resamples arbitrary WAV
//! input into the 22050 Hz mono buffer the core requires.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use log::debug;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::constants::AUDIO_SAMPLE_RATE;
use crate::{AudioBuffer, Error};

/// Loads a WAV file as a mono 22050 Hz `AudioBuffer`.
pub fn load_audio<P: AsRef<Path>>(path: P) -> Result<AudioBuffer, Error> {
    let reader = WavReader::open(path).map_err(io_err)?;
    let spec = reader.spec();
    debug!(
        "wav input: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    let mono = read_mono(reader)?;
    let samples = if spec.sample_rate == AUDIO_SAMPLE_RATE as u32 {
        mono.into_iter().map(|v| v as f32).collect()
    } else {
        resample(mono, spec.sample_rate)?
    };

    Ok(AudioBuffer {
        samples,
        sample_rate: AUDIO_SAMPLE_RATE as u32,
        channels: 1,
    })
}

/// Decodes all frames, averaging channels down to mono.
fn read_mono<R: std::io::Read>(reader: WavReader<R>) -> Result<Vec<f64>, Error> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(Error::Io("wav file declares zero channels".to_string()));
    }

    let mut mono = Vec::new();
    let mut frame = Vec::with_capacity(channels);
    match spec.sample_format {
        SampleFormat::Int => {
            let max_sample_value = 2f64.powi(spec.bits_per_sample as i32 - 1) - 1.0;
            for sample in reader.into_samples::<i32>() {
                frame.push(sample.map_err(io_err)? as f64 / max_sample_value);
                if frame.len() == channels {
                    mono.push(frame.iter().sum::<f64>() / channels as f64);
                    frame.clear();
                }
            }
        }
        SampleFormat::Float => {
            for sample in reader.into_samples::<f32>() {
                frame.push(sample.map_err(io_err)? as f64);
                if frame.len() == channels {
                    mono.push(frame.iter().sum::<f64>() / channels as f64);
                    frame.clear();
                }
            }
        }
    }

    Ok(mono)
}

fn resample(samples: Vec<f64>, source_rate: u32) -> Result<Vec<f32>, Error> {
    if samples.is_empty() {
        return Ok(vec![]);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = AUDIO_SAMPLE_RATE as f64 / source_rate as f64;
    let chunk_size = samples.len();
    let mut resampler =
        SincFixedIn::<f64>::new(ratio, 2.0, params, chunk_size, 1).map_err(io_err)?;
    let resampled = resampler.process(&[samples], None).map_err(io_err)?;

    Ok(resampled[0].iter().map(|&v| v as f32).collect())
}

fn io_err(e: impl std::fmt::Display) -> Error {
    Error::Io(e.to_string())
}
