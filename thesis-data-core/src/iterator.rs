//! Episode iterator.
use crate::{
    record::{Record, RecordValue},
    Act, Env, Field, Info, Mode, Obs, Policy,
};
use anyhow::Result;
use log::trace;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs a policy in an environment and emits step records.
///
/// The iterator owns the environment and the policy. Every call of
/// [`EpisodeIterator::episode`] resets the environment and returns a lazy,
/// finite sequence of step records, so the same iterator produces any
/// number of episodes.
///
/// ```mermaid
/// graph LR
///     Env -->|state| Policy
///     Policy -->|action| Env
///     Env -->|reward, nextstate, done, info| Mode
///     Mode --> Record
/// ```
///
/// An episode ends after a step with `done`, or after `max_length` steps.
/// In the latter case the last record is marked as done.
pub struct EpisodeIterator<E: Env, P: Policy<E>> {
    env: E,
    policy: P,
    mode: Mode,
    max_length: usize,
}

impl<E: Env, P: Policy<E>> EpisodeIterator<E, P> {
    /// Constructs an episode iterator.
    pub fn new(env: E, policy: P, mode: Mode, max_length: usize) -> Self {
        Self {
            env,
            policy,
            mode,
            max_length,
        }
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// The environment.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// The policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The recording mode.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// The maximum number of steps of an episode.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Resets the environment and starts an episode.
    pub fn episode(&mut self) -> Result<Episode<'_, E, P>> {
        let (obs, _) = self.env.reset()?;
        Ok(Episode::new(self, obs))
    }

    /// Resets the environment with the given index and starts an episode.
    pub fn episode_with_index(&mut self, ix: usize) -> Result<Episode<'_, E, P>> {
        let (obs, _) = self.env.reset_with_index(ix)?;
        Ok(Episode::new(self, obs))
    }

    /// Returns the environment and the policy.
    pub fn into_inner(self) -> (E, P) {
        (self.env, self.policy)
    }
}

/// Step records of a single episode.
///
/// Yields an error at most once; the episode ends after it.
pub struct Episode<'a, E: Env, P: Policy<E>> {
    iter: &'a mut EpisodeIterator<E, P>,
    obs: Option<E::Obs>,
    count: usize,
}

impl<'a, E: Env, P: Policy<E>> Episode<'a, E, P> {
    fn new(iter: &'a mut EpisodeIterator<E, P>, obs: E::Obs) -> Self {
        Self {
            iter,
            obs: Some(obs),
            count: 0,
        }
    }

    /// The number of steps taken so far.
    pub fn len_so_far(&self) -> usize {
        self.count
    }

    fn step(&mut self, obs: E::Obs) -> Result<(Record, Option<E::Obs>)> {
        let act = self.iter.policy.sample(&obs)?;
        let step = self.iter.env.step(&act)?;
        self.count += 1;
        let done = step.is_done() || self.count >= self.iter.max_length;
        trace!("step {}, done = {}", self.count, done);

        let mode = &self.iter.mode;
        let mut full = Record::empty();
        for field in Field::all() {
            if !mode.contains(field) {
                continue;
            }
            let value = match field {
                Field::State => obs.to_record_value(),
                Field::Action => step.act.to_record_value(),
                Field::Reward => RecordValue::Scalar(step.reward),
                Field::NextState => step.obs.to_record_value(),
                Field::Done => RecordValue::Bool(done),
                Field::Info => RecordValue::Nested(step.info.to_record()),
            };
            full.insert(field.key(), value);
        }
        let record = mode.select(full);

        Ok((record, if done { None } else { Some(step.obs) }))
    }
}

impl<'a, E: Env, P: Policy<E>> Iterator for Episode<'a, E, P> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.count >= self.iter.max_length {
            return None;
        }
        let obs = self.obs.take()?;
        match self.step(obs) {
            Ok((record, next_obs)) => {
                self.obs = next_obs;
                Some(Ok(record))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
