//! Core types, error definitions, and tensor containers for began_dataset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file not found: {path}")]
    MissingFile { path: PathBuf },
    #[error("array '{key}' not found in {path}")]
    MissingKey { path: PathBuf, key: String },
    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("safetensors error at {path}: {source}")]
    SafeTensors {
        path: PathBuf,
        #[source]
        source: safetensors::SafeTensorError,
    },
    #[error(
        "background {width}x{height} is smaller than the {resolution}x{resolution} crop window"
    )]
    InvalidDimensions {
        width: u32,
        height: u32,
        resolution: u32,
    },
    #[error("malformed data in {path}: {msg}")]
    Format { path: PathBuf, msg: String },
    #[error("unsupported dtype {dtype} for '{key}' (expected F32 or F64)")]
    UnsupportedDtype { key: String, dtype: String },
    #[error("shape mismatch: {0}")]
    Shape(String),
}

/// Dense image batch in NHWC layout: `[count, height, width, channels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    shape: [usize; 4],
}

impl ImageTensor {
    pub fn new(data: Vec<f32>, shape: [usize; 4]) -> DatasetResult<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(DatasetError::Shape(format!(
                "{} values cannot fill shape {:?} ({} expected)",
                data.len(),
                shape,
                expected
            )));
        }
        if shape[1] != shape[2] {
            return Err(DatasetError::Shape(format!(
                "images must be square, got {}x{}",
                shape[1], shape[2]
            )));
        }
        Ok(Self { data, shape })
    }

    /// Reorder a `[count, channels, height, width]` buffer (burn's conv layout) into NHWC.
    pub fn from_nchw(data: &[f32], shape: [usize; 4]) -> DatasetResult<Self> {
        let [n, c, h, w] = shape;
        if data.len() != n * c * h * w {
            return Err(DatasetError::Shape(format!(
                "{} values cannot fill NCHW shape {:?}",
                data.len(),
                shape
            )));
        }
        let mut out = vec![0.0f32; data.len()];
        for i in 0..n {
            for ch in 0..c {
                for y in 0..h {
                    for x in 0..w {
                        let src = ((i * c + ch) * h + y) * w + x;
                        let dst = ((i * h + y) * w + x) * c + ch;
                        out[dst] = data[src];
                    }
                }
            }
        }
        Self::new(out, [n, h, w, c])
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn count(&self) -> usize {
        self.shape[0]
    }

    /// Side length of the square images.
    pub fn resolution(&self) -> usize {
        self.shape[1]
    }

    pub fn channels(&self) -> usize {
        self.shape[3]
    }

    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    fn image_len(&self) -> usize {
        self.shape[1] * self.shape[2] * self.shape[3]
    }

    /// HWC pixels of image `index`.
    pub fn image(&self, index: usize) -> &[f32] {
        let len = self.image_len();
        &self.data[index * len..(index + 1) * len]
    }

    /// Gather the listed images into a new tensor, in the given order.
    pub fn select(&self, indices: &[usize]) -> DatasetResult<Self> {
        let len = self.image_len();
        let mut data = Vec::with_capacity(indices.len() * len);
        for &idx in indices {
            if idx >= self.count() {
                return Err(DatasetError::Shape(format!(
                    "index {idx} out of range for {} images",
                    self.count()
                )));
            }
            data.extend_from_slice(self.image(idx));
        }
        Self::new(
            data,
            [indices.len(), self.shape[1], self.shape[2], self.shape[3]],
        )
    }

    /// Same pixels in `[count, channels, height, width]` order.
    pub fn to_nchw(&self) -> Vec<f32> {
        let [n, h, w, c] = self.shape;
        let mut out = vec![0.0f32; self.data.len()];
        for i in 0..n {
            for y in 0..h {
                for x in 0..w {
                    for ch in 0..c {
                        let src = ((i * h + y) * w + x) * c + ch;
                        let dst = ((i * c + ch) * h + y) * w + x;
                        out[dst] = self.data[src];
                    }
                }
            }
        }
        out
    }
}

/// Grayscale base digits, `[count, side, side, 1]`, intensities in [0, 1].
#[derive(Debug, Clone)]
pub struct DigitSet {
    pub side: usize,
    pub pixels: Vec<f32>,
}

impl DigitSet {
    pub fn new(side: usize, pixels: Vec<f32>) -> DatasetResult<Self> {
        let per = side * side;
        if per == 0 || pixels.len() % per != 0 {
            return Err(DatasetError::Shape(format!(
                "{} pixels is not a whole number of {side}x{side} digits",
                pixels.len()
            )));
        }
        Ok(Self { side, pixels })
    }

    pub fn len(&self) -> usize {
        self.pixels.len() / (self.side * self.side)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn digit(&self, index: usize) -> &[f32] {
        let per = self.side * self.side;
        &self.pixels[index * per..(index + 1) * per]
    }
}

/// How foreground pixels are inverted over the normalized background crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Inversion {
    /// Mirror within the [-1, 1] frame (`v' = -v`); output stays in [-1, 1].
    #[default]
    Symmetric,
    /// Legacy `v' = 1 - v` on the [-1, 1] crop; output spans [-1, 2].
    Literal,
}

impl Inversion {
    pub fn apply(self, v: f32) -> f32 {
        match self {
            Inversion::Symmetric => -v,
            Inversion::Literal => 1.0 - v,
        }
    }

    /// Closed value range produced by the builder under this mode.
    pub fn output_range(self) -> (f32, f32) {
        match self {
            Inversion::Symmetric => (-1.0, 1.0),
            Inversion::Literal => (-1.0, 2.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub count: usize,
    pub resolution: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub non_finite: usize,
}
