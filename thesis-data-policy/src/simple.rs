//! Deterministic policies ignoring observations.
use anyhow::Result;
use ndarray::ArrayD;
use thesis_data_core::{error::ThesisDataError, Env, GymAct, Policy, Space};

/// Always takes the same action.
#[derive(Clone, Debug)]
pub struct Constant {
    act: GymAct,
}

impl Constant {
    /// Constructs the policy.
    pub fn new(act: GymAct) -> Self {
        Self { act }
    }

    /// Takes the smallest discrete action, or the box action closest to zero.
    pub fn default_for(space: &Space) -> Result<Self> {
        let act = match space {
            Space::Discrete { start, .. } => GymAct::Discrete(*start),
            Space::Box {
                shape, low, high, ..
            } => {
                let size = shape.iter().product::<usize>();
                let data = (0..size)
                    .map(|i| 0f64.max(low.at(i)).min(high.at(i)) as f32)
                    .collect();
                GymAct::Continuous(ArrayD::from_shape_vec(shape.clone(), data)?)
            }
            Space::Other { repr } => {
                return Err(ThesisDataError::UnsupportedSpace(repr.clone()).into())
            }
        };
        Ok(Self { act })
    }
}

impl<E: Env<Act = GymAct>> Policy<E> for Constant {
    fn sample(&mut self, _obs: &E::Obs) -> Result<GymAct> {
        Ok(self.act.clone())
    }
}

/// Takes the discrete actions of the space in turn.
#[derive(Clone, Debug)]
pub struct Cycle {
    start: i64,
    n: i64,
    next: i64,
}

impl Cycle {
    /// Constructs the policy for a discrete action space.
    pub fn new(space: &Space) -> Result<Self> {
        match space {
            Space::Discrete { n, start } if *n > 0 => Ok(Self {
                start: *start,
                n: *n,
                next: 0,
            }),
            space => Err(ThesisDataError::UnsupportedSpace(format!("{:?}", space)).into()),
        }
    }
}

impl<E: Env<Act = GymAct>> Policy<E> for Cycle {
    fn sample(&mut self, _obs: &E::Obs) -> Result<GymAct> {
        let act = self.start + self.next;
        self.next = (self.next + 1) % self.n;
        Ok(GymAct::Discrete(act))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thesis_data_core::Bound;

    #[test]
    fn test_default_constant() -> Result<()> {
        let c = Constant::default_for(&Space::Discrete { n: 4, start: 2 })?;
        assert_eq!(c.act, GymAct::Discrete(2));

        let space = Space::Box {
            shape: vec![2],
            low: Bound::Array(vec![0.5, -1.0]),
            high: Bound::Scalar(1.0),
            dtype: "float32".into(),
        };
        let c = Constant::default_for(&space)?;
        assert_eq!(
            c.act,
            GymAct::Continuous(ArrayD::from_shape_vec(vec![2], vec![0.5, 0.0])?)
        );
        assert!(space.contains(&c.act));
        Ok(())
    }

    #[test]
    fn test_cycle_requires_discrete() {
        assert!(Cycle::new(&Space::uniform_box(&[1], 0.0, 1.0)).is_err());
        assert!(Cycle::new(&Space::discrete(0)).is_err());
    }
}
