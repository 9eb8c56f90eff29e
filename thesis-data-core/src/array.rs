//! Observation and action types based on [`ndarray`].
use crate::{record::RecordValue, Act, Obs};
use ndarray::ArrayD;

/// Observation represented by an n-dimensional `f32` array.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayObs(pub ArrayD<f32>);

impl Obs for ArrayObs {
    fn to_record_value(&self) -> RecordValue {
        let shape = self.0.shape().to_vec();
        RecordValue::ArrayD(self.0.iter().copied().collect(), shape)
    }
}

impl From<ArrayD<f32>> for ArrayObs {
    fn from(array: ArrayD<f32>) -> Self {
        Self(array)
    }
}

/// Action of a gym environment, either discrete or continuous.
#[derive(Clone, Debug, PartialEq)]
pub enum GymAct {
    /// Index of a discrete action.
    Discrete(i64),

    /// Continuous action.
    Continuous(ArrayD<f32>),
}

impl GymAct {
    /// Returns the index of a discrete action.
    pub fn as_discrete(&self) -> Option<i64> {
        match self {
            Self::Discrete(a) => Some(*a),
            Self::Continuous(_) => None,
        }
    }
}

impl Act for GymAct {
    fn to_record_value(&self) -> RecordValue {
        match self {
            Self::Discrete(a) => RecordValue::Integer(*a),
            Self::Continuous(a) => {
                RecordValue::ArrayD(a.iter().copied().collect(), a.shape().to_vec())
            }
        }
    }
}

impl From<i64> for GymAct {
    fn from(a: i64) -> Self {
        Self::Discrete(a)
    }
}

impl From<ArrayD<f32>> for GymAct {
    fn from(a: ArrayD<f32>) -> Self {
        Self::Continuous(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_act_record_value() {
        assert_eq!(GymAct::from(1i64).to_record_value(), RecordValue::Integer(1));
        let a = GymAct::from(ArrayD::from_elem(vec![2], 0.5f32));
        assert_eq!(a.to_record_value(), RecordValue::ArrayD(vec![0.5, 0.5], vec![2]));
        assert_eq!(a.as_discrete(), None);
    }

    #[test]
    fn test_obs_record_value() {
        let obs = ArrayObs(ArrayD::zeros(vec![1, 2, 2]));
        assert_eq!(
            obs.to_record_value(),
            RecordValue::ArrayD(vec![0.0; 4], vec![1, 2, 2])
        );
    }
}
