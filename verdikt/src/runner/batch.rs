use std::path::PathBuf;

use candle_core::{Device, Tensor};
use ndarray::{Array2, Array3, Axis};
use thiserror::Error;

use crate::{
    augment::{Augmentation, AugmentationPlan, apply_augmentation},
    forensics::build_input_planes,
    model::Scorer,
};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to decode image {path}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("inference failed")]
    Inference(#[source] candle_core::Error),
    #[error("resource exhaustion persisted at batch size 1")]
    ResourceExhausted(#[source] candle_core::Error),
}

fn is_exhaustion_message(error: &candle_core::Error) -> bool {
    let message = error.to_string().to_ascii_lowercase();
    message.contains("out of memory") || message.contains("out_of_memory")
}

impl RunnerError {
    fn is_resource_exhaustion(&self) -> bool {
        match self {
            RunnerError::Inference(source) => {
                is_exhaustion_message(source)
            },
            RunnerError::ResourceExhausted(_) => true,
            RunnerError::Image { .. } => false,
        }
    }
}

/// Drives a set of classifiers over a stream of images in fixed-size
/// batches.
///
/// Worker threads handle decoding and forensic-tensor construction only;
/// every classifier scores the whole batch on the control thread, one
/// model after another. When the underlying runtime signals resource
/// exhaustion and the batch size is above one, the entire run is retried
/// once at batch size one before the error propagates.
pub struct BatchRunner {
    pub batch_size: usize,
    pub workers: usize,
}

struct WorkItem<'run> {
    image: &'run PathBuf,
    augmentation: &'run Augmentation,
}

impl BatchRunner {
    pub fn new(
        batch_size: usize,
        workers: usize,
    ) -> Self {
        Self {
            batch_size: batch_size.max(1),
            workers,
        }
    }

    /// Scores every image under every plan variant and returns one
    /// probability per image per model, with variant scores mean-reduced
    /// in probability space. The outer vector is model-major, matching
    /// the order of `models`.
    pub fn run(
        &self,
        images: &[PathBuf],
        plan: &AugmentationPlan,
        models: &[&dyn Scorer],
        device: &Device,
        progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<Vec<Vec<f32>>, RunnerError> {
        if images.is_empty() {
            return Ok(vec![Vec::new(); models.len()]);
        }

        match self.run_once(
            images,
            plan,
            models,
            device,
            self.batch_size,
            progress,
        ) {
            Err(error)
                if error.is_resource_exhaustion()
                    && self.batch_size > 1 =>
            {
                tracing::warn!(
                    batch_size = self.batch_size,
                    "resource exhaustion, retrying whole run at batch \
                     size 1"
                );
                self.run_once(images, plan, models, device, 1, progress)
                    .map_err(|retry_error| match retry_error {
                        RunnerError::Inference(source)
                            if is_exhaustion_message(&source) =>
                        {
                            RunnerError::ResourceExhausted(source)
                        },
                        other => other,
                    })
            },
            other => other,
        }
    }

    fn run_once(
        &self,
        images: &[PathBuf],
        plan: &AugmentationPlan,
        models: &[&dyn Scorer],
        device: &Device,
        batch_size: usize,
        progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<Vec<Vec<f32>>, RunnerError> {
        let items: Vec<WorkItem> = images
            .iter()
            .flat_map(|image| {
                plan.variants().iter().map(move |augmentation| WorkItem {
                    image,
                    augmentation,
                })
            })
            .collect();

        let mut raw_probabilities: Vec<Vec<f32>> =
            vec![Vec::with_capacity(items.len()); models.len()];
        let mut processed = 0usize;
        for chunk in items.chunks(batch_size) {
            let planes = self.build_planes(chunk, plan.target_size)?;
            let batch = stack_planes(planes, device)
                .map_err(RunnerError::Inference)?;

            for (model_index, model) in models.iter().enumerate() {
                let logits =
                    model.score(&batch).map_err(RunnerError::Inference)?;
                let logits = logits
                    .flatten_all()
                    .and_then(|flat| flat.to_vec1::<f32>())
                    .map_err(RunnerError::Inference)?;
                raw_probabilities[model_index]
                    .extend(logits.into_iter().map(sigmoid));
            }

            processed += chunk.len();
            if let Some(progress) = progress {
                progress(processed, items.len());
            }
        }

        Ok(raw_probabilities
            .into_iter()
            .map(|probabilities| {
                mean_per_image(probabilities, images.len(), plan.len())
            })
            .collect())
    }

    fn build_planes(
        &self,
        chunk: &[WorkItem],
        target_size: u32,
    ) -> Result<Vec<Array3<f32>>, RunnerError> {
        if self.workers <= 1 || chunk.len() <= 1 {
            return chunk
                .iter()
                .map(|item| process_item(item, target_size))
                .collect();
        }

        let stripe = chunk.len().div_ceil(self.workers);
        let mut slots: Vec<Option<Result<Array3<f32>, RunnerError>>> =
            chunk.iter().map(|_| None).collect();
        std::thread::scope(|scope| {
            for (slot_stripe, item_stripe) in
                slots.chunks_mut(stripe).zip(chunk.chunks(stripe))
            {
                scope.spawn(move || {
                    for (slot, item) in
                        slot_stripe.iter_mut().zip(item_stripe)
                    {
                        *slot = Some(process_item(item, target_size));
                    }
                });
            }
        });

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(RunnerError::Inference(candle_core::Error::Msg(
                        "preprocessing worker dropped an item".into(),
                    )))
                })
            })
            .collect()
    }
}

fn process_item(
    item: &WorkItem,
    target_size: u32,
) -> Result<Array3<f32>, RunnerError> {
    let decoded =
        image::open(item.image).map_err(|source| RunnerError::Image {
            path: item.image.display().to_string(),
            source,
        })?;
    let transformed = apply_augmentation(
        &decoded.to_rgb8(),
        item.augmentation,
        target_size,
    );
    Ok(build_input_planes(&transformed))
}

fn stack_planes(
    planes: Vec<Array3<f32>>,
    device: &Device,
) -> candle_core::Result<Tensor> {
    let tensors = planes
        .into_iter()
        .map(|plane| {
            let dims = plane.dim();
            let data: Vec<f32> = match plane.as_slice() {
                Some(slice) => slice.to_vec(),
                None => plane.iter().copied().collect(),
            };
            Tensor::from_vec(data, dims, device)
        })
        .collect::<candle_core::Result<Vec<_>>>()?;
    Tensor::stack(&tensors, 0)
}

fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

fn mean_per_image(
    probabilities: Vec<f32>,
    image_count: usize,
    variant_count: usize,
) -> Vec<f32> {
    if variant_count <= 1 {
        return probabilities;
    }
    Array2::from_shape_vec((image_count, variant_count), probabilities)
        .map(|matrix| {
            matrix
                .mean_axis(Axis(1))
                .map(|means| means.to_vec())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_squashes_into_unit_interval() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn mean_per_image_reduces_variant_axis() {
        let probabilities = vec![0.2, 0.4, 0.8, 1.0];
        let means = mean_per_image(probabilities, 2, 2);
        assert_eq!(means.len(), 2);
        assert!((means[0] - 0.3).abs() < 1e-6);
        assert!((means[1] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn single_variant_mean_is_identity() {
        let probabilities = vec![0.1, 0.9];
        assert_eq!(
            mean_per_image(probabilities.clone(), 2, 1),
            probabilities
        );
    }

    #[test]
    fn oom_messages_are_recognized() {
        let error = RunnerError::Inference(candle_core::Error::Msg(
            "CUDA_ERROR_OUT_OF_MEMORY".into(),
        ));
        assert!(error.is_resource_exhaustion());
        let error = RunnerError::Inference(candle_core::Error::Msg(
            "driver reported out of memory".into(),
        ));
        assert!(error.is_resource_exhaustion());
        let error = RunnerError::Inference(candle_core::Error::Msg(
            "shape mismatch".into(),
        ));
        assert!(!error.is_resource_exhaustion());
    }
}
