//! This module is used for tests.
use crate::{
    error::ThesisDataError,
    record::{Record, RecordValue},
    ArrayObs, Env, EnvSpec, GymAct, Policy, Space, Step,
};
use anyhow::Result;
use ndarray::ArrayD;

/// Configuration of [`DummyEnv`].
#[derive(Clone, Debug)]
pub struct DummyEnvConfig {
    /// The number of steps until the episode terminates.
    pub episode_length: usize,

    /// The number of discrete actions.
    pub n_actions: i64,
}

impl Default for DummyEnvConfig {
    fn default() -> Self {
        Self {
            episode_length: 10,
            n_actions: 2,
        }
    }
}

impl DummyEnvConfig {
    /// Sets the episode length.
    pub fn episode_length(mut self, v: usize) -> Self {
        self.episode_length = v;
        self
    }

    /// Sets the number of actions.
    pub fn n_actions(mut self, v: i64) -> Self {
        self.n_actions = v;
        self
    }
}

/// Dummy env.
///
/// The observation is the step count as a one element array, the reward is
/// the action and the info holds the step count.
pub struct DummyEnv {
    config: DummyEnvConfig,
    count: usize,
}

impl DummyEnv {
    fn obs(&self) -> ArrayObs {
        ArrayObs(ArrayD::from_elem(vec![1], self.count as f32))
    }

    fn info(&self) -> Record {
        Record::from_slice(&[("step", RecordValue::Integer(self.count as i64))])
    }
}

impl Env for DummyEnv {
    type Config = DummyEnvConfig;
    type Act = GymAct;
    type Obs = ArrayObs;
    type Info = Record;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            count: 0,
        })
    }

    fn reset(&mut self) -> Result<(Self::Obs, Self::Info)> {
        self.count = 0;
        Ok((self.obs(), self.info()))
    }

    fn reset_with_index(&mut self, _ix: usize) -> Result<(Self::Obs, Self::Info)> {
        self.reset()
    }

    fn step(&mut self, a: &Self::Act) -> Result<Step<Self>> {
        if !self.action_space().contains(a) {
            return Err(ThesisDataError::InvalidAction(format!("{:?}", a)).into());
        }
        let reward = a.as_discrete().unwrap_or(0) as f32;
        self.count += 1;
        let is_terminated = self.count >= self.config.episode_length;
        Ok(Step::new(
            self.obs(),
            a.clone(),
            reward,
            is_terminated,
            false,
            self.info(),
        ))
    }

    fn spec(&self) -> EnvSpec {
        EnvSpec::new("Dummy-v0").max_episode_steps(Some(self.config.episode_length))
    }

    fn action_space(&self) -> Space {
        Space::discrete(self.config.n_actions)
    }

    fn observation_space(&self) -> Space {
        Space::uniform_box(&[1], 0.0, f64::INFINITY)
    }
}

/// Dummy policy, always taking the same action.
pub struct DummyPolicy {
    act: i64,
}

impl DummyPolicy {
    /// Constructs the policy.
    pub fn new(act: i64) -> Self {
        Self { act }
    }
}

impl Policy<DummyEnv> for DummyPolicy {
    fn sample(&mut self, _obs: &ArrayObs) -> Result<GymAct> {
        Ok(GymAct::Discrete(self.act))
    }
}
