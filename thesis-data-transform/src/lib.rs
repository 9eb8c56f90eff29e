//! Transforms of images, actions and step records.
//!
//! Images are [`ArrayD<f32>`] with shape `[..., H, W]` and values in `[0, 1]`.
//! Leading dimensions (batch, channel) are carried through, and random
//! parameters are drawn once per call and shared by all planes of the image.
//!
//! * Anomaly transforms ([`RandomMask`], [`RandomResizedPad`],
//!   [`RandomBrightness`], [`SaltAndPepper`], [`RandomSplitFlipVertical`],
//!   [`RandomSplitFlipHorizontal`], [`GaussianBlur`], [`RandomResizedCrop`],
//!   [`RandomAffine`])
//!   introduce artificial anomalies into observations.
//! * Combinators ([`RandomApply`], [`ApplyWithProbability`],
//!   [`RandomReplaceAction`]) apply transforms to parts of a batch and return
//!   anomaly labels.
//! * [`RecordTransform`]s change step records before they are written:
//!   [`ImageConversion`], [`DatasetTransform`] and [`AnomalyInjection`].
//!
//! Randomness comes from a [`StdRng`] passed by the caller, so a seeded
//! generator reproduces the same transforms.
mod anomaly;
mod combinator;
mod conversion;
mod dataset;
mod mnist;
mod plane;
mod record;
pub use anomaly::{
    GaussianBlur, PaddingMode, RandomAffine, RandomBrightness, RandomMask, RandomResizedCrop,
    RandomResizedPad, RandomSplitFlipHorizontal, RandomSplitFlipVertical, SaltAndPepper,
    SaltAndPepperMode,
};
pub use combinator::{ApplyWithProbability, RandomApply, RandomReplaceAction};
pub use conversion::ImageConversion;
pub use dataset::{dataset_transform, DatasetTransform};
pub use mnist::{anomaly_by_name, mnist_anomalies, MnistTransform, MNIST_ANOMALIES};
pub use record::{AnomalyInjection, RecordTransform, ANOMALY_KEY};

use anyhow::Result;
use ndarray::ArrayD;
use rand::rngs::StdRng;

/// A transform of images.
pub trait Transform {
    /// Transforms an image `[..., H, W]`, returning a new image.
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>>;

    /// Name of the transform.
    fn name(&self) -> String {
        let name = std::any::type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name).to_string()
    }
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<ArrayD<f32>> {
        self.as_ref().apply(img, rng)
    }

    fn name(&self) -> String {
        self.as_ref().name()
    }
}
