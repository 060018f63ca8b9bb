//! Batch iteration and tensor assembly for training and validation.

use crate::types::{ImageArray, LabeledArrays, CHANNELS};
use burn::tensor::{backend::Backend, Int, Tensor, TensorData};
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub struct BurnBatch<B: Backend> {
    /// Normalized images, shape `[batch, 3, height, width]`, values in `[0, 1]`.
    pub images: Tensor<B, 4>,
    /// Class indices, shape `[batch]`.
    pub targets: Tensor<B, 1, Int>,
}

/// Normalize the selected images to `[0, 1]` floats in NCHW layout.
pub fn images_to_tensor<B: Backend>(
    images: &ImageArray,
    indices: &[usize],
    device: &B::Device,
) -> Tensor<B, 4> {
    let plane = images.height * images.width;
    let mut buf: Vec<f32> = Vec::with_capacity(indices.len() * CHANNELS * plane);
    for &i in indices {
        let pixels = images.image(i);
        for c in 0..CHANNELS {
            for p in 0..plane {
                buf.push(pixels[p * CHANNELS + c] as f32 / 255.0);
            }
        }
    }
    Tensor::<B, 4>::from_data(
        TensorData::new(buf, [indices.len(), CHANNELS, images.height, images.width]),
        device,
    )
}

pub fn labels_to_tensor<B: Backend>(
    labels: &[i64],
    indices: &[usize],
    device: &B::Device,
) -> Tensor<B, 1, Int> {
    let selected: Vec<i64> = indices.iter().map(|&i| labels[i]).collect();
    Tensor::<B, 1, Int>::from_data(TensorData::new(selected, [indices.len()]), device)
}

pub fn make_batch<B: Backend>(
    data: &LabeledArrays,
    indices: &[usize],
    device: &B::Device,
) -> BurnBatch<B> {
    BurnBatch {
        images: images_to_tensor(&data.images, indices, device),
        targets: labels_to_tensor(&data.labels, indices, device),
    }
}

/// Yields index batches over a fixed subset; reshuffled per epoch when enabled.
///
/// The last partial batch is kept.
pub struct BatchIter {
    base: Vec<usize>,
    order: Vec<usize>,
    batch_size: usize,
    shuffle: bool,
    seed: Option<u64>,
    cursor: usize,
}

impl BatchIter {
    pub fn new(indices: Vec<usize>, batch_size: usize, shuffle: bool, seed: Option<u64>) -> Self {
        let mut iter = Self {
            order: indices.clone(),
            base: indices,
            batch_size: batch_size.max(1),
            shuffle,
            seed,
            cursor: 0,
        };
        iter.reset(0);
        iter
    }

    /// Rewind for `epoch`, shuffling with `seed + epoch` if shuffling is on.
    pub fn reset(&mut self, epoch: usize) {
        self.cursor = 0;
        self.order.clone_from(&self.base);
        if !self.shuffle {
            return;
        }
        let mut rng = match self.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed.wrapping_add(epoch as u64)),
            None => rand::rngs::StdRng::from_rng(&mut rand::rng()),
        };
        self.order.shuffle(&mut rng);
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn num_batches(&self) -> usize {
        self.base.len().div_ceil(self.batch_size)
    }
}

impl Iterator for BatchIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.order[self.cursor..end].to_vec();
        self.cursor = end;
        Some(batch)
    }
}
