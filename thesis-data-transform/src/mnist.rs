//! Transforms of MNIST images.
use crate::{
    GaussianBlur, PaddingMode, RandomAffine, RandomBrightness, RandomMask, RandomResizedCrop,
    RandomResizedPad, RandomSplitFlipHorizontal, RandomSplitFlipVertical, SaltAndPepper,
    SaltAndPepperMode, Transform,
};
use anyhow::{anyhow, bail, Result};
use image::imageops::FilterType;
use ndarray::{ArrayD, Axis};

/// Names of the MNIST anomaly transforms, accepted by [`anomaly_by_name`].
pub const MNIST_ANOMALIES: [&str; 9] = [
    "resized_pad",
    "resized_crop",
    "affine",
    "brightness",
    "gaussian_blur",
    "salt_and_pepper",
    "split_flip_vertical",
    "split_flip_horizontal",
    "mask",
];

/// Converts raw MNIST images into the format of transforms.
///
/// `u8` images `[N, H, W]` become `f32` images `[N, 1, H, W]` in `[0, 1]`.
/// A single image `[H, W]` becomes `[1, H, W]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MnistTransform;

impl MnistTransform {
    /// Converts the images.
    pub fn apply(&self, x: &ArrayD<u8>) -> Result<ArrayD<f32>> {
        let x = x.mapv(|v| v as f32 / 255.0);
        match x.ndim() {
            2 => Ok(x.insert_axis(Axis(0))),
            3 => Ok(x.insert_axis(Axis(1))),
            _ => bail!("Expected MNIST images [N, H, W], got shape {:?}", x.shape()),
        }
    }
}

fn mnist_anomaly(key: &str) -> Option<Box<dyn Transform>> {
    let t: Box<dyn Transform> = match key {
        "resizedpad" => Box::new(RandomResizedPad::new(
            (5, 13),
            vec![PaddingMode::Reflect, PaddingMode::Symmetric],
        )),
        "resizedcrop" => Box::new(RandomResizedCrop::new((28, 28)).filter(FilterType::Nearest)),
        "affine" => Box::new(RandomAffine::new(90.0, (0.0, 0.3), (0.5, 1.5))),
        "brightness" => Box::new(RandomBrightness::new((0.2, 0.5))),
        "gaussianblur" | "blur" => Box::new(GaussianBlur::new(9)),
        "saltandpepper" => Box::new(SaltAndPepper::new(0.15, 0.1, 0.9, SaltAndPepperMode::Rgb)),
        "splitflipvertical" => Box::new(RandomSplitFlipVertical::new((0.3, 0.6))),
        "splitfliphorizontal" => Box::new(RandomSplitFlipHorizontal::new((0.3, 0.6))),
        "mask" => Box::new(RandomMask::new(
            (0.2, 0.8),
            (0.2, 0.8),
            (1.0 / 5.0, 1.0 / 2.0),
            (1.0 / 5.0, 1.0 / 2.0),
            0.0,
        )),
        _ => return None,
    };
    Some(t)
}

/// The anomaly transforms used with MNIST, with their default parameters.
pub fn mnist_anomalies() -> Vec<Box<dyn Transform>> {
    MNIST_ANOMALIES
        .iter()
        .filter_map(|name| mnist_anomaly(&name.replace('_', "")))
        .collect()
}

/// Looks up an MNIST anomaly transform.
///
/// Names are matched ignoring case, `_`, `-` and a leading `random`, so
/// `salt_and_pepper` and `SaltAndPepper`, or `mask` and `RandomMask`, are
/// the same transform.
pub fn anomaly_by_name(name: &str) -> Result<Box<dyn Transform>> {
    let key = name.to_lowercase().replace(['_', '-'], "");
    let key = key.strip_prefix("random").unwrap_or(&key);
    mnist_anomaly(key).ok_or_else(|| {
        anyhow!(
            "Unknown anomaly: {}, must be one of {}",
            name,
            MNIST_ANOMALIES.join(", ")
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_mnist_transform() -> Result<()> {
        let x = ArrayD::from_elem(IxDyn(&[5, 28, 28]), 255u8);
        let y = MnistTransform.apply(&x)?;
        assert_eq!(y.shape(), &[5, 1, 28, 28]);
        assert!(y.iter().all(|v| *v == 1.0));

        let y = MnistTransform.apply(&ArrayD::zeros(IxDyn(&[28, 28])))?;
        assert_eq!(y.shape(), &[1, 28, 28]);
        assert!(MnistTransform.apply(&ArrayD::zeros(IxDyn(&[28]))).is_err());
        Ok(())
    }

    #[test]
    fn test_mnist_anomalies() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut rng = StdRng::seed_from_u64(7);
        let img = MnistTransform.apply(&ArrayD::from_shape_fn(IxDyn(&[2, 28, 28]), |ix| {
            ((ix[1] * 28 + ix[2]) % 256) as u8
        }))?;

        let anomalies = mnist_anomalies();
        assert_eq!(anomalies.len(), MNIST_ANOMALIES.len());
        for t in anomalies.iter() {
            let out = t.apply(&img, &mut rng)?;
            assert_eq!(out.shape(), img.shape(), "{}", t.name());
            assert!(out.iter().all(|v| (0.0..=1.0).contains(v)), "{}", t.name());
        }
        Ok(())
    }

    #[test]
    fn test_anomaly_by_name() -> Result<()> {
        assert_eq!(anomaly_by_name("salt_and_pepper")?.name(), "SaltAndPepper");
        assert_eq!(anomaly_by_name("RandomMask")?.name(), "RandomMask");
        assert_eq!(anomaly_by_name("split-flip-vertical")?.name(), "RandomSplitFlipVertical");
        assert_eq!(anomaly_by_name("blur")?.name(), "GaussianBlur");
        assert_eq!(anomaly_by_name("RandomAffine")?.name(), "RandomAffine");
        assert!(anomaly_by_name("rotate").is_err());
        Ok(())
    }
}
