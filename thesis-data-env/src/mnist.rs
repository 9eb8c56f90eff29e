//! MNIST environment.
//!
//! Images of MNIST are grouped by their digit. At each step the agent moves
//! from the current group `x` to group `(x + a + 1) % n_groups`, where `a` is
//! the action, and observes an image of the new group. The image within a group
//! advances by a random offset in `[1, 20)` at every step. The reward is always
//! zero; the label of the current group is given as information.
mod config;
mod data;
use anyhow::Result;
pub use config::MnistEnvConfig;
pub use data::{MnistData, MNIST_MIRROR};
use log::trace;
use ndarray::ArrayD;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_yaml::{Mapping, Value};
use std::sync::Arc;
use thesis_data_core::{
    error::ThesisDataError,
    record::{Record, RecordValue},
    ArrayObs, Env, EnvSpec, GymAct, Space, Step,
};

/// MNIST environment.
pub struct MnistEnv {
    config: MnistEnvConfig,
    data: Arc<MnistData>,
    groups: Vec<Vec<usize>>,
    rng: StdRng,
    index: usize,
    step: usize,
    group: usize,
}

impl MnistEnv {
    /// Constructs the environment on the given data.
    pub fn from_data(config: &MnistEnvConfig, data: Arc<MnistData>, seed: i64) -> Result<Self> {
        let groups = data.groups();
        if groups.is_empty() || groups.iter().any(|g| g.is_empty()) {
            return Err(ThesisDataError::UnsupportedSpace(
                "every label from 0 to the maximum label needs at least one image".to_string(),
            )
            .into());
        }
        if config.num_actions < 1 {
            return Err(ThesisDataError::UnsupportedSpace(format!(
                "Discrete({})",
                config.num_actions
            ))
            .into());
        }

        Ok(Self {
            config: config.clone(),
            data,
            groups,
            rng: StdRng::seed_from_u64(seed as u64),
            index: 0,
            step: 0,
            group: 0,
        })
    }

    /// The number of groups, i.e., distinct labels.
    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    /// Label of the current group.
    pub fn label(&self) -> usize {
        self.group
    }

    fn obs(&self) -> Result<ArrayObs> {
        let group = &self.groups[self.group];
        let ix = group[self.index % group.len()];
        let (rows, cols) = self.data.image_shape();
        let pixels = self.data.image(ix).iter().map(|p| *p as f32 / 255.0).collect();
        Ok(ArrayObs(ArrayD::from_shape_vec(vec![1, rows, cols], pixels)?))
    }

    fn info(&self) -> Record {
        Record::from_slice(&[("label", RecordValue::Integer(self.group as i64))])
    }
}

impl Env for MnistEnv {
    type Config = MnistEnvConfig;
    type Obs = ArrayObs;
    type Act = GymAct;
    type Info = Record;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let data = match &config.data {
            Some(data) => data.clone(),
            None => MnistData::load(config.resolve_data_dir()?, config.train)?,
        };
        Self::from_data(config, data, seed)
    }

    fn reset(&mut self) -> Result<(Self::Obs, Self::Info)> {
        self.index = 0;
        self.step = 0;
        self.group = self.rng.gen_range(0..self.config.num_actions) as usize % self.n_groups();
        trace!("MnistEnv::reset(), group = {}", self.group);
        Ok((self.obs()?, self.info()))
    }

    fn reset_with_index(&mut self, ix: usize) -> Result<(Self::Obs, Self::Info)> {
        self.rng = StdRng::seed_from_u64(ix as u64);
        self.reset()
    }

    fn step(&mut self, a: &Self::Act) -> Result<Step<Self>> {
        if !self.action_space().contains(a) {
            return Err(ThesisDataError::InvalidAction(format!("{:?}", a)).into());
        }
        let act = a.as_discrete().unwrap_or(0) as usize;

        self.group = (self.group + act + 1) % self.n_groups();
        self.index += self.rng.gen_range(1..20);
        self.step += 1;
        let done = self.step >= self.config.max_episode_length;
        trace!("MnistEnv::step(), group = {}, index = {}", self.group, self.index);

        Ok(Step::new(
            self.obs()?,
            a.clone(),
            0.0,
            done,
            false,
            self.info(),
        ))
    }

    fn spec(&self) -> EnvSpec {
        let mut kwargs = Mapping::new();
        kwargs.insert("num_actions".into(), Value::from(self.config.num_actions));
        kwargs.insert("train".into(), Value::Bool(self.config.train));
        kwargs.insert(
            "max_episode_length".into(),
            Value::from(self.config.max_episode_length as u64),
        );
        EnvSpec::new(crate::MNIST_ENV_ID)
            .entry_point("thesis_data_env::MnistEnv")
            .kwargs(kwargs)
    }

    fn action_space(&self) -> Space {
        Space::discrete(self.config.num_actions)
    }

    fn observation_space(&self) -> Space {
        let (rows, cols) = self.data.image_shape();
        Space::uniform_box(&[1, rows, cols], 0.0, 1.0)
    }

    fn action_meanings(&self) -> Option<Vec<String>> {
        let n = self.config.num_actions;
        Some((0..n).map(|i| format!("(x+{}) % {}", i + 1, n)).collect())
    }
}
