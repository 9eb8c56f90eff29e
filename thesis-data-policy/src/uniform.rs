//! Uniform random policy.
use anyhow::Result;
use ndarray::ArrayD;
use thesis_data_core::{error::ThesisDataError, Env, GymAct, Policy, Space};

/// Samples actions uniformly from the action space.
///
/// Discrete actions are drawn uniformly. Elements of box actions are drawn
/// uniformly within their bounds. An element with an infinite bound is drawn
/// from the unit interval next to its finite bound, or from `[-1, 1]` when
/// both bounds are infinite.
pub struct Uniform {
    space: Space,
    rng: fastrand::Rng,
}

impl Uniform {
    /// Constructs the policy with a random seed.
    pub fn new(space: Space, seed: u64) -> Result<Self> {
        match &space {
            Space::Other { repr } => {
                return Err(ThesisDataError::UnsupportedSpace(repr.clone()).into())
            }
            Space::Discrete { n, .. } if *n < 1 => {
                return Err(ThesisDataError::UnsupportedSpace(format!("{:?}", space)).into())
            }
            _ => {}
        }
        Ok(Self {
            space,
            rng: fastrand::Rng::with_seed(seed),
        })
    }

    fn sample_element(&self, low: f64, high: f64) -> f64 {
        let u = self.rng.f64();
        match (low.is_finite(), high.is_finite()) {
            (true, true) => low + u * (high - low),
            (true, false) => low + u,
            (false, true) => high - u,
            (false, false) => 2.0 * u - 1.0,
        }
    }

    /// Samples an action.
    pub fn sample_act(&mut self) -> Result<GymAct> {
        match &self.space {
            Space::Discrete { n, start } => Ok(GymAct::Discrete(self.rng.i64(*start..start + n))),
            Space::Box {
                shape,
                low,
                high,
                dtype,
            } => {
                let size = shape.iter().product::<usize>();
                let integer = self.space.has_integer_dtype();
                let data = (0..size)
                    .map(|i| {
                        let v = self.sample_element(low.at(i), high.at(i));
                        if integer {
                            v.floor() as f32
                        } else {
                            v as f32
                        }
                    })
                    .collect::<Vec<_>>();
                log::trace!("Uniform::sample_act(), dtype = {}", dtype);
                Ok(GymAct::Continuous(ArrayD::from_shape_vec(shape.clone(), data)?))
            }
            Space::Other { repr } => Err(ThesisDataError::UnsupportedSpace(repr.clone()).into()),
        }
    }
}

impl<E: Env<Act = GymAct>> Policy<E> for Uniform {
    fn sample(&mut self, _obs: &E::Obs) -> Result<GymAct> {
        self.sample_act()
    }
}
