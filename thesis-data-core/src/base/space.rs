//! Descriptors of action and observation spaces.
use crate::GymAct;
use serde::{Deserialize, Serialize};

/// Lower or upper bound of a box space.
///
/// A bound that is the same for every element is kept as a scalar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    /// The same bound for all elements.
    Scalar(f64),

    /// Element-wise bounds of the flattened space.
    Array(Vec<f64>),
}

impl Bound {
    /// Bound of the `i`-th element of the flattened space.
    pub fn at(&self, i: usize) -> f64 {
        match self {
            Self::Scalar(v) => *v,
            Self::Array(vs) => vs.get(i).copied().unwrap_or(f64::NAN),
        }
    }

    /// Collapses element-wise bounds into a scalar when all of them are equal.
    pub fn collapse(self) -> Self {
        match self {
            Self::Array(vs) if !vs.is_empty() && vs.iter().all(|v| *v == vs[0]) => {
                Self::Scalar(vs[0])
            }
            b => b,
        }
    }
}

/// Space of actions or observations of an environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Space {
    /// Integers `start, start + 1, ..., start + n - 1`.
    Discrete {
        /// The number of elements.
        n: i64,

        /// The smallest element.
        #[serde(default)]
        start: i64,
    },

    /// An n-dimensional box.
    Box {
        /// Shape of the box.
        shape: Vec<usize>,

        /// Lower bound.
        low: Bound,

        /// Upper bound.
        high: Bound,

        /// Element type, using numpy names (`float32`, `uint8`, ...).
        dtype: String,
    },

    /// A space that is only described by its representation.
    Other {
        /// Representation of the space.
        repr: String,
    },
}

impl Space {
    /// A discrete space starting at zero.
    pub fn discrete(n: i64) -> Self {
        Self::Discrete { n, start: 0 }
    }

    /// A `float32` box with scalar bounds.
    pub fn uniform_box(shape: &[usize], low: f64, high: f64) -> Self {
        Self::Box {
            shape: shape.to_vec(),
            low: Bound::Scalar(low),
            high: Bound::Scalar(high),
            dtype: "float32".to_string(),
        }
    }

    /// Shape of elements of the space. Discrete spaces have an empty shape.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Box { shape, .. } => shape.clone(),
            _ => vec![],
        }
    }

    /// Returns `true` if this is a three dimensional box, i.e., an image.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Box { shape, .. } if shape.len() == 3)
    }

    /// Returns `true` if elements are integers.
    pub fn has_integer_dtype(&self) -> bool {
        match self {
            Self::Box { dtype, .. } => dtype.starts_with("int") || dtype.starts_with("uint"),
            Self::Discrete { .. } => true,
            Self::Other { .. } => false,
        }
    }

    /// Returns `true` if the action is an element of the space.
    pub fn contains(&self, act: &GymAct) -> bool {
        match (self, act) {
            (Self::Discrete { n, start }, GymAct::Discrete(a)) => *a >= *start && *a < start + n,
            (Self::Box { shape, low, high, .. }, GymAct::Continuous(a)) => {
                a.shape() == shape.as_slice()
                    && a.iter().enumerate().all(|(i, v)| {
                        let v = *v as f64;
                        v >= low.at(i) && v <= high.at(i)
                    })
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    #[test]
    fn test_space_yaml() {
        let space = Space::uniform_box(&[1, 28, 28], 0.0, 1.0);
        let yaml = serde_yaml::to_string(&space).unwrap();
        assert!(yaml.contains("type: Box"));
        assert!(yaml.contains("dtype: float32"));
        let space_: Space = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(space, space_);

        let space: Space = serde_yaml::from_str("type: Discrete\nn: 4\n").unwrap();
        assert_eq!(space, Space::discrete(4));
    }

    #[test]
    fn test_contains() {
        let space = Space::discrete(2);
        assert!(space.contains(&GymAct::Discrete(1)));
        assert!(!space.contains(&GymAct::Discrete(2)));
        assert!(!space.contains(&GymAct::Discrete(-1)));

        let space = Space::Box {
            shape: vec![2],
            low: Bound::Array(vec![-1.0, 0.0]),
            high: Bound::Scalar(1.0),
            dtype: "float32".into(),
        };
        let inside = ArrayD::from_shape_vec(vec![2], vec![-0.5, 0.5]).unwrap();
        let outside = ArrayD::from_shape_vec(vec![2], vec![-0.5, -0.5]).unwrap();
        assert!(space.contains(&GymAct::Continuous(inside)));
        assert!(!space.contains(&GymAct::Continuous(outside)));
        assert!(!space.contains(&GymAct::Discrete(0)));
    }

    #[test]
    fn test_image_and_dtype() {
        let space = Space::Box {
            shape: vec![210, 160, 3],
            low: Bound::Scalar(0.0),
            high: Bound::Scalar(255.0),
            dtype: "uint8".into(),
        };
        assert!(space.is_image());
        assert!(space.has_integer_dtype());
        assert!(!Space::uniform_box(&[4], -1.0, 1.0).is_image());
        assert_eq!(
            Bound::Array(vec![0.5, 0.5]).collapse(),
            Bound::Scalar(0.5)
        );
    }
}
