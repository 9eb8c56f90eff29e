//! Transforms applied to parts of a batch, returning anomaly labels.
use crate::Transform;
use anyhow::{bail, Result};
use ndarray::{ArrayD, Axis};
use rand::{rngs::StdRng, seq::index, Rng};

/// Applies a transform with a given probability.
#[derive(Clone, Debug)]
pub struct ApplyWithProbability<T> {
    transform: T,
    prob: f32,
}

impl<T: Transform> ApplyWithProbability<T> {
    /// Constructs the combinator.
    pub fn new(transform: T, prob: f32) -> Self {
        Self { transform, prob }
    }

    /// Returns the image and whether it was transformed.
    pub fn apply(&self, img: &ArrayD<f32>, rng: &mut StdRng) -> Result<(ArrayD<f32>, bool)> {
        if rng.gen::<f32>() > self.prob {
            Ok((img.clone(), false))
        } else {
            Ok((self.transform.apply(img, rng)?, true))
        }
    }
}

/// Applies a transform to a random proportion of the elements of a batch.
///
/// The batch is `[N, ...]`; the transform is applied to each selected element
/// on its own. A 1-d batch is treated as `[N, 1]`.
#[derive(Clone, Debug)]
pub struct RandomApply<T> {
    transform: T,
    prop: f32,
}

impl<T: Transform> RandomApply<T> {
    /// Constructs the combinator.
    pub fn new(transform: T, prop: f32) -> Self {
        Self { transform, prop }
    }

    /// Returns the batch and, for each element, whether it was transformed.
    pub fn apply(&self, batch: &ArrayD<f32>, rng: &mut StdRng) -> Result<(ArrayD<f32>, Vec<bool>)> {
        let mut x = match batch.ndim() {
            0 => bail!("RandomApply needs a batch, got a scalar"),
            1 => batch.clone().insert_axis(Axis(1)),
            _ => batch.clone(),
        };
        let n = x.shape()[0];
        let k = ((self.prop.max(0.0) * n as f32) as usize).min(n);
        let mut labels = vec![false; n];

        for i in index::sample(rng, n, k).into_iter() {
            let y = self.transform.apply(&x.index_axis(Axis(0), i).to_owned(), rng)?;
            let mut slot = x.index_axis_mut(Axis(0), i);
            if slot.shape() != y.shape() {
                bail!(
                    "{} changed the shape of an element from {:?} to {:?}",
                    self.transform.name(),
                    slot.shape(),
                    y.shape()
                );
            }
            slot.assign(&y);
            labels[i] = true;
        }
        Ok((x, labels))
    }
}

/// Replaces each discrete action with a different action, drawn uniformly.
#[derive(Clone, Debug)]
pub struct RandomReplaceAction {
    num_actions: i64,
}

impl RandomReplaceAction {
    /// Constructs the transform for actions `0..num_actions`.
    pub fn new(num_actions: i64) -> Self {
        Self { num_actions }
    }

    /// Replaces the actions.
    pub fn apply(&self, actions: &ArrayD<i64>, rng: &mut StdRng) -> Result<ArrayD<i64>> {
        let n = self.num_actions;
        if n < 2 {
            bail!("Cannot replace actions with {} action(s)", n);
        }
        if let Some(a) = actions.iter().find(|a| !(0..n).contains(*a)) {
            bail!("Action {} is not in [0, {})", a, n);
        }
        Ok(actions.mapv(|a| {
            let c = rng.gen_range(0..n - 1);
            if c < a {
                c
            } else {
                c + 1
            }
        }))
    }
}
