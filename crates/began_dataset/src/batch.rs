//! Epoch ordering and batch upload to burn tensors.

use crate::types::{DatasetResult, ImageTensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Permutation over an immutable image tensor, reshuffled once per epoch.
///
/// Each shuffle permutes the previous order, so randomness compounds across
/// epochs while the underlying pixels are never moved.
pub struct EpochOrder {
    order: Vec<usize>,
    rng: StdRng,
}

impl EpochOrder {
    pub fn new(len: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            order: (0..len).collect(),
            rng,
        }
    }

    pub fn shuffle(&mut self) {
        self.order.shuffle(&mut self.rng);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Full batches per epoch; the trailing remainder is dropped.
    pub fn batches_per_epoch(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            0
        } else {
            self.order.len() / batch_size
        }
    }

    /// Dataset indices of contiguous batch `batch_idx` in the current order.
    pub fn batch(&self, batch_idx: usize, batch_size: usize) -> &[usize] {
        let start = batch_idx * batch_size;
        &self.order[start..start + batch_size]
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

/// Upload an NHWC host tensor as an NCHW burn tensor.
#[cfg(feature = "burn-runtime")]
pub fn to_device<B: burn::tensor::backend::Backend>(
    images: &ImageTensor,
    device: &B::Device,
) -> burn::tensor::Tensor<B, 4> {
    let [n, h, w, c] = images.shape();
    let data = burn::tensor::TensorData::new(images.to_nchw(), [n, c, h, w]);
    burn::tensor::Tensor::<B, 4>::from_data(data, device)
}

/// Download an NCHW burn tensor into an NHWC host tensor.
#[cfg(feature = "burn-runtime")]
pub fn from_device<B: burn::tensor::backend::Backend>(
    tensor: burn::tensor::Tensor<B, 4>,
) -> DatasetResult<ImageTensor> {
    let dims = tensor.dims();
    let values = tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| crate::types::DatasetError::Shape(format!("tensor download failed: {e:?}")))?;
    ImageTensor::from_nchw(&values, dims)
}

/// Gather batch `batch_idx` through `order` and upload it.
#[cfg(feature = "burn-runtime")]
pub fn next_batch<B: burn::tensor::backend::Backend>(
    dataset: &ImageTensor,
    order: &EpochOrder,
    batch_idx: usize,
    batch_size: usize,
    device: &B::Device,
) -> DatasetResult<(ImageTensor, burn::tensor::Tensor<B, 4>)> {
    let host = dataset.select(order.batch(batch_idx, batch_size))?;
    let tensor = to_device::<B>(&host, device);
    Ok((host, tensor))
}
