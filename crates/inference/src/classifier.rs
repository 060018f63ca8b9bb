use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use data_contracts::{bin_guidance, class_name, BinGuidance, ModelMetadata};
use models::{TrashCnn, TrashCnnConfig};
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::Path;
use trash_dataset::{decode_payload, image_to_array, images_to_tensor, ImageArray, ImagePayload};

/// Top class for one image, with the full probability vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    pub confidence: f32,
    pub probabilities: Vec<f32>,
    /// Disposal bin and advice for `label`.
    pub guidance: BinGuidance,
}

/// A reloaded network together with the metadata it was saved with.
pub struct TrashClassifier<B: Backend> {
    model: TrashCnn<B>,
    metadata: ModelMetadata,
    device: B::Device,
}

/// Load a checkpoint and its sidecar; see [`training::load_checkpoint`].
pub fn load_classifier<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> anyhow::Result<TrashClassifier<B>> {
    let (model, metadata) = training::load_checkpoint::<B>(path, device)?;
    log::info!(
        "loaded {} ({} classes, {}px input)",
        path.display(),
        metadata.model.num_classes,
        metadata.model.image_size
    );
    Ok(TrashClassifier {
        model,
        metadata,
        device: device.clone(),
    })
}

impl<B: Backend> TrashClassifier<B> {
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn num_classes(&self) -> usize {
        self.metadata.model.num_classes
    }

    pub fn image_size(&self) -> usize {
        self.metadata.model.image_size
    }

    /// Layer table plus class names and the last recorded training epoch.
    pub fn summary(&self) -> String {
        let cfg = TrashCnnConfig {
            num_classes: self.metadata.model.num_classes,
            image_size: self.metadata.model.image_size,
            channels: self.metadata.model.channels,
        };
        let mut out = cfg.describe();
        let _ = write!(out, "\nClasses: {}", self.metadata.class_names.join(", "));
        if let Some(epoch) = self.metadata.last_epoch() {
            let _ = write!(
                out,
                "\nLast epoch {}: loss={:.4} accuracy={:.4}",
                epoch.epoch, epoch.loss, epoch.accuracy
            );
            if let (Some(loss), Some(acc)) = (epoch.val_loss, epoch.val_accuracy) {
                let _ = write!(out, " val_loss={loss:.4} val_accuracy={acc:.4}");
            }
        }
        out
    }

    /// Class probabilities, shape `[N, num_classes]`.
    pub fn predict(&self, images: &ImageArray) -> anyhow::Result<Tensor<B, 2>> {
        let size = self.image_size();
        if images.height != size || images.width != size {
            anyhow::bail!(
                "model expects {size}x{size} images, got {}x{}",
                images.width,
                images.height
            );
        }
        if images.is_empty() {
            anyhow::bail!("no images to predict");
        }
        let indices: Vec<usize> = (0..images.len).collect();
        let input = images_to_tensor::<B>(images, &indices, &self.device);
        Ok(self.model.forward_probs(input))
    }

    /// Decode, resize, and classify a single image file.
    pub fn classify_image(&self, path: &Path) -> anyhow::Result<Prediction> {
        let img = decode_payload(&ImagePayload::Path(path.to_path_buf()))?;
        let size = self.image_size();
        let pixels = image_to_array(&img, (size as u32, size as u32));
        let array = ImageArray {
            data: pixels,
            len: 1,
            height: size,
            width: size,
        };
        let probabilities = self
            .predict(&array)?
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("reading predictions: {e:?}"))?;
        Ok(top_prediction(probabilities, &self.metadata.class_names))
    }
}

fn top_prediction(probabilities: Vec<f32>, class_names: &[String]) -> Prediction {
    let (index, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });
    let label = class_name(class_names, index);
    Prediction {
        index,
        guidance: bin_guidance(&label),
        label,
        confidence,
        probabilities,
    }
}

/// A single seeded random image, shape `(1, size, size, 3)`.
pub fn random_input(size: usize, seed: u64) -> ImageArray {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; size * size * trash_dataset::CHANNELS];
    rng.fill(&mut data[..]);
    ImageArray {
        data,
        len: 1,
        height: size,
        width: size,
    }
}

/// The `pred shape` and `pred (first 5 elements)` lines printed after a sanity prediction.
pub fn sanity_report(dims: [usize; 2], values: &[f32]) -> String {
    let head: Vec<String> = values.iter().take(5).map(|v| format!("{v:.6}")).collect();
    format!(
        "pred shape: ({}, {})\npred (first 5 elements): [{}]",
        dims[0],
        dims[1],
        head.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_contracts::DisposalBin;

    #[test]
    fn random_input_is_seeded() {
        let a = random_input(20, 3);
        let b = random_input(20, 3);
        assert_eq!(a.shape(), [1, 20, 20, 3]);
        assert_eq!(a.data, b.data);
        assert_ne!(a.data, random_input(20, 4).data);
    }

    #[test]
    fn sanity_report_shows_shape_and_head() {
        let report = sanity_report([1, 6], &[0.1, 0.2, 0.3, 0.1, 0.2, 0.1]);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "pred shape: (1, 6)");
        assert_eq!(
            lines[1],
            "pred (first 5 elements): [0.100000, 0.200000, 0.300000, 0.100000, 0.200000]"
        );
    }

    #[test]
    fn top_prediction_picks_argmax_and_names_it() {
        let names = vec!["glass".to_string(), "metal".to_string()];
        let pred = top_prediction(vec![0.2, 0.7, 0.1], &names);
        assert_eq!(pred.index, 1);
        assert_eq!(pred.label, "metal");
        assert!((pred.confidence - 0.7).abs() < 1e-6);
        assert_eq!(pred.guidance.bin, DisposalBin::Recyclable);

        let pred = top_prediction(vec![0.1, 0.2, 0.7], &names);
        assert_eq!(pred.label, "class_2");
        assert_eq!(pred.guidance.bin, DisposalBin::Residual);
    }
}
