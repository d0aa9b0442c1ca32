//! The model collaborator: an opaque network that maps one audio window to
//! frame, onset and contour activations.

use std::path::Path;

use ndarray::{Array2, Array3, Axis, Ix2};
use ort::{GraphOptimizationLevel, Session, Tensor};

use crate::Error;

// Output tensor names fixed by the upstream model graph.
const OUTPUT_NAME_FRAMES: &str = "Identity_1";
const OUTPUT_NAME_ONSETS: &str = "Identity_2";
const OUTPUT_NAME_CONTOURS: &str = "Identity";

/// One window's worth of model activations, batch dimension squeezed.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub frames: Array2<f32>,
    pub onsets: Array2<f32>,
    pub contours: Array2<f32>,
}

/// Abstracts the inference runtime so the decoder never touches tensor
/// names or session plumbing.
pub trait InferenceEngine {
    /// Run the model on one audio window of shape `(1, AUDIO_N_SAMPLES, 1)`.
    ///
    /// Takes `&mut self` because some runtimes require it for `run`.
    fn run(&mut self, window: Array3<f32>) -> Result<ModelOutput, Error>;
}

/// ONNX Runtime-backed engine.
pub struct OrtEngine {
    session: Session,
}

impl OrtEngine {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let session = Session::builder()
            .map_err(model_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_err)?
            .with_intra_threads(4)
            .map_err(model_err)?
            .commit_from_file(path)
            .map_err(model_err)?;

        Ok(Self { session })
    }
}

impl InferenceEngine for OrtEngine {
    fn run(&mut self, window: Array3<f32>) -> Result<ModelOutput, Error> {
        let input_shape: Vec<i64> = window.shape().iter().map(|&dim| dim as i64).collect();
        let input_data: Vec<f32> = window.into_raw_vec();
        let input = Tensor::from_array((input_shape, input_data)).map_err(model_err)?;

        let outputs = self
            .session
            .run(ort::inputs![input].map_err(model_err)?)
            .map_err(model_err)?;

        let extract = |name: &str| -> Result<Array2<f32>, Error> {
            let value = outputs
                .get(name)
                .ok_or_else(|| Error::Model(format!("model graph has no output named {}", name)))?;
            let view = value.try_extract_tensor::<f32>().map_err(model_err)?;
            if view.ndim() != 3 || view.shape()[0] != 1 {
                return Err(Error::Shape(format!(
                    "output {} has shape {:?}, expected (1, frames, bins)",
                    name,
                    view.shape()
                )));
            }
            Ok(view
                .index_axis(Axis(0), 0)
                .into_dimensionality::<Ix2>()
                .map_err(|e| Error::Shape(e.to_string()))?
                .to_owned())
        };

        Ok(ModelOutput {
            frames: extract(OUTPUT_NAME_FRAMES)?,
            onsets: extract(OUTPUT_NAME_ONSETS)?,
            contours: extract(OUTPUT_NAME_CONTOURS)?,
        })
    }
}

fn model_err(e: impl std::fmt::Display) -> Error {
    Error::Model(e.to_string())
}
