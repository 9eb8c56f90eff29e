//! Conversions of image observations before they are written.
use crate::{record::map_states, RecordTransform};
use anyhow::{bail, Result};
use ndarray::{ArrayD, IxDyn};
use thesis_data_core::{record::Record, Bound, Space};

/// A conversion of image observations, applied to `state` and `nextstate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageConversion {
    /// Integer images `[0, 255]` to float images `[0, 1]`.
    Float,

    /// Channel-last images `[H, W, C]` to channel-first `[C, H, W]`.
    Chw,
}

impl ImageConversion {
    /// Conversions needed to write observations of a space.
    ///
    /// Only 3-d boxes are images. Integer images are converted to float and
    /// images whose last dimension is 1 or 3 are taken to be channel-last.
    pub fn for_space(space: &Space) -> Vec<Self> {
        let mut conversions = vec![];
        if !space.is_image() {
            return conversions;
        }
        if space.has_integer_dtype() {
            conversions.push(Self::Float);
        }
        if matches!(space.shape().last(), Some(1 | 3)) {
            conversions.push(Self::Chw);
        }
        conversions
    }

    /// Fully qualified name, listed as a wrapper in dataset metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Float => "thesis_data_transform::Float",
            Self::Chw => "thesis_data_transform::Chw",
        }
    }

    /// Converts an observation.
    pub fn convert(&self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Self::Float => Ok(x / 255.0),
            Self::Chw => {
                let nd = x.ndim();
                if nd < 3 {
                    bail!("Expected an image [..., H, W, C], got shape {:?}", x.shape());
                }
                let mut axes = (0..nd - 3).collect::<Vec<_>>();
                axes.extend([nd - 1, nd - 3, nd - 2]);
                Ok(x.permuted_axes(IxDyn(&axes)))
            }
        }
    }

    /// The space of converted observations.
    pub fn convert_space(&self, space: &Space) -> Space {
        let (shape, low, high, dtype) = match space {
            Space::Box {
                shape,
                low,
                high,
                dtype,
            } if shape.len() == 3 => (shape, low, high, dtype),
            _ => return space.clone(),
        };

        match self {
            Self::Float => {
                let scale = |b: &Bound| match b {
                    Bound::Scalar(v) => Bound::Scalar(v / 255.0),
                    Bound::Array(vs) => Bound::Array(vs.iter().map(|v| v / 255.0).collect()),
                };
                Space::Box {
                    shape: shape.clone(),
                    low: scale(low),
                    high: scale(high),
                    dtype: "float32".to_string(),
                }
            }
            Self::Chw => {
                let (h, w, c) = (shape[0], shape[1], shape[2]);
                let permute = |b: &Bound| match b {
                    Bound::Scalar(v) => Bound::Scalar(*v),
                    Bound::Array(_) => Bound::Array(
                        (0..c)
                            .flat_map(|ci| (0..h * w).map(move |hw| b.at(hw * c + ci)))
                            .collect(),
                    ),
                };
                Space::Box {
                    shape: vec![c, h, w],
                    low: permute(low),
                    high: permute(high),
                    dtype: dtype.clone(),
                }
            }
        }
    }
}

impl RecordTransform for ImageConversion {
    fn apply(&mut self, record: Record) -> Result<Record> {
        let conversion = *self;
        map_states(record, |x| conversion.convert(x))
    }

    fn name(&self) -> String {
        ImageConversion::name(self).to_string()
    }
}
