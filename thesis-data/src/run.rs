//! Generation of a dataset.
use crate::GenerateConfig;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use thesis_data_core::{Env, EpisodeIterator, Mode, Policy};
use thesis_data_dataset::{default_root, expand_home, DatasetWriter, Meta};
use thesis_data_env::{is_native, MnistEnv, MnistEnvConfig};
use thesis_data_policy::{build_policy, PolicySpec};
use thesis_data_transform::{anomaly_by_name, dataset_transform, AnomalyInjection};

/// Result of [`run`].
#[derive(Clone, Debug)]
pub struct Generated {
    /// Directory of the dataset.
    pub path: PathBuf,

    /// Directories of the episodes written in this run.
    pub episodes: Vec<PathBuf>,

    /// Metadata written to `meta.yaml`.
    pub meta: Meta,
}

fn generate<E, P>(env: E, policy: P, seed: u64, config: &GenerateConfig, path: PathBuf) -> Result<Generated>
where
    E: Env,
    P: Policy<E>,
{
    let mode = Mode::new(&config.mode)?;
    let mut iterator = EpisodeIterator::new(env, policy, mode, config.max_episode_length);

    let mut writer = DatasetWriter::new(&path, config.write_mode)?;
    if let Some(t) = dataset_transform(&config.env_id) {
        writer = writer.with_transform(Box::new(t));
    }
    if let Some(anomaly) = &config.anomaly {
        let transform = anomaly_by_name(&anomaly.name)?;
        writer = writer.with_transform(Box::new(AnomalyInjection::new(transform, anomaly.prob, seed)));
    }

    let episodes = writer.write(&mut iterator, config.num_episodes)?;
    let meta = writer.write_config(&iterator)?;
    iterator.env_mut().close()?;

    Ok(Generated {
        path,
        episodes,
        meta,
    })
}

fn models_dir(config: &GenerateConfig) -> Result<PathBuf> {
    match &config.models_dir {
        Some(dir) => expand_home(dir),
        None => {
            let root = match &config.root {
                Some(root) => expand_home(root)?,
                None => default_root()?,
            };
            Ok(root.join("rl-trained-agents"))
        }
    }
}

#[cfg(feature = "py-gym")]
fn run_pretrained(config: &GenerateConfig, name: &str, seed: u64, path: PathBuf) -> Result<Generated> {
    use thesis_data_py_gym_env::{load_pretrained, Sb3Config};

    let sb3_config = Sb3Config::new(name, &config.env_id, models_dir(config)?).kwargs(config.kwargs.clone());
    info!("Using SB3 path: {:?}", sb3_config.agent_dir());
    let (env, policy) = load_pretrained(&sb3_config, seed as i64)?;
    generate(env, policy, seed, config, path)
}

#[cfg(feature = "py-gym")]
fn run_gym(config: &GenerateConfig, spec: &PolicySpec, seed: u64, path: PathBuf) -> Result<Generated> {
    use thesis_data_py_gym_env::{GymEnv, GymEnvConfig};

    let env_config = GymEnvConfig::default()
        .name(&config.env_id)
        .kwargs(config.kwargs.clone());
    let env = GymEnv::build(&env_config, seed as i64)?;
    let policy = build_policy::<GymEnv>(spec, &env.action_space(), seed)?;
    generate(env, policy, seed, config, path)
}

#[cfg(not(feature = "py-gym"))]
fn run_pretrained(config: &GenerateConfig, name: &str, _seed: u64, _path: PathBuf) -> Result<Generated> {
    anyhow::bail!(
        "Pretrained policy {} on {} needs the py-gym feature, models in {:?}",
        name,
        config.env_id,
        models_dir(config)?
    )
}

#[cfg(not(feature = "py-gym"))]
fn run_gym(config: &GenerateConfig, _spec: &PolicySpec, _seed: u64, _path: PathBuf) -> Result<Generated> {
    anyhow::bail!("Environment {} needs the py-gym feature", config.env_id)
}

/// Generates a dataset.
///
/// The environment is the native MNIST environment, a Python Gym
/// environment, or, for a pretrained policy, the environment of the
/// stable-baselines3 zoo agent. Episodes are written to the path resolved
/// from the template in `config`, followed by `meta.yaml`.
pub fn run(config: &GenerateConfig) -> Result<Generated> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
    let spec = PolicySpec::parse(&config.policy)?;
    let path = config
        .path_template(&spec)
        .resolve()
        .context("Couldn't resolve the dataset path")?;
    info!("Environment: {}, policy: {}, seed: {}", config.env_id, spec, seed);
    info!("Dataset: {}", path.display());

    match &spec {
        PolicySpec::Pretrained(name) => run_pretrained(config, name, seed, path),
        _ if is_native(&config.env_id) => {
            let env_config = MnistEnvConfig::from_kwargs(&config.kwargs)?;
            let env = MnistEnv::build(&env_config, seed as i64)?;
            let policy = build_policy::<MnistEnv>(&spec, &env.action_space(), seed)?;
            generate(env, policy, seed, config, path)
        }
        _ => run_gym(config, &spec, seed, path),
    }
}
