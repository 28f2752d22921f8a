//! Single-array dataset container: `<name>.safetensors` holding one tensor keyed by `name`.

use crate::types::{DatasetError, DatasetResult, ImageTensor};
use safetensors::tensor::TensorView;
use safetensors::{serialize_to_file, Dtype, SafeTensors};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DATASET_EXTENSION: &str = "safetensors";

pub fn dataset_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{DATASET_EXTENSION}"))
}

pub fn exists(dir: &Path, name: &str) -> bool {
    dataset_path(dir, name).is_file()
}

/// Write `tensor` under key `name`, replacing any previous file.
pub fn save(dir: &Path, name: &str, tensor: &ImageTensor) -> DatasetResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dataset_path(dir, name);
    let bytes: Vec<u8> = tensor
        .as_slice()
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let view = TensorView::new(Dtype::F32, tensor.shape().to_vec(), &bytes).map_err(|source| {
        DatasetError::SafeTensors {
            path: path.clone(),
            source,
        }
    })?;
    let metadata: HashMap<String, String> =
        [("layout".to_string(), "nhwc".to_string())].into_iter().collect();
    serialize_to_file(vec![(name.to_string(), view)], &Some(metadata), &path).map_err(
        |source| DatasetError::SafeTensors {
            path: path.clone(),
            source,
        },
    )?;
    debug!("wrote {} ({} bytes of f32 data)", path.display(), bytes.len());
    Ok(path)
}

/// Read the array stored under `name` as f32. Every call goes back to disk.
pub fn load(dir: &Path, name: &str) -> DatasetResult<ImageTensor> {
    let path = dataset_path(dir, name);
    if !path.is_file() {
        return Err(DatasetError::MissingFile { path });
    }
    let buffer = fs::read(&path).map_err(|source| DatasetError::Io {
        path: path.clone(),
        source,
    })?;
    let tensors = SafeTensors::deserialize(&buffer).map_err(|source| DatasetError::SafeTensors {
        path: path.clone(),
        source,
    })?;
    let view = match tensors.tensor(name) {
        Ok(view) => view,
        Err(_) => {
            return Err(DatasetError::MissingKey {
                path,
                key: name.to_string(),
            })
        }
    };

    let shape = view.shape();
    if shape.len() != 4 {
        return Err(DatasetError::Shape(format!(
            "'{name}' in {} has rank {}, expected 4",
            path.display(),
            shape.len()
        )));
    }
    let data: Vec<f32> = match view.dtype() {
        Dtype::F32 => view
            .data()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F64 => view
            .data()
            .chunks_exact(8)
            .map(|b| {
                f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
            })
            .collect(),
        other => {
            return Err(DatasetError::UnsupportedDtype {
                key: name.to_string(),
                dtype: format!("{other:?}"),
            })
        }
    };
    ImageTensor::new(data, [shape[0], shape[1], shape[2], shape[3]])
}
