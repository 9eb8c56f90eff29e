//! Policies that do not need a trained model.
//!
//! * [`Uniform`] samples actions uniformly from the action space.
//! * [`Constant`] always takes the same action.
//! * [`Cycle`] takes the discrete actions `0, 1, ..., n - 1` in turn.
//! * [`Scripted`] replays actions listed in a YAML file.
//!
//! A policy is selected by a [`PolicySpec`], parsed from the name given on
//! the command line, and built with [`build_policy`].
mod scripted;
mod simple;
mod spec;
mod uniform;
pub use scripted::{Scripted, ScriptedAct, ScriptedConfig};
pub use simple::{Constant, Cycle};
pub use spec::PolicySpec;
pub use uniform::Uniform;

use anyhow::{bail, Result};
use thesis_data_core::{ArrayObs, Configurable, Env, GymAct, Policy, Space};

/// Builds the policy given by `spec` for an action space.
///
/// Pretrained policies are loaded together with their environment and
/// cannot be built here.
pub fn build_policy<E>(spec: &PolicySpec, action_space: &Space, seed: u64) -> Result<Box<dyn Policy<E>>>
where
    E: Env<Obs = ArrayObs, Act = GymAct> + 'static,
{
    let policy: Box<dyn Policy<E>> = match spec {
        PolicySpec::Uniform => Box::new(Uniform::new(action_space.clone(), seed)?),
        PolicySpec::Constant(None) => Box::new(Constant::default_for(action_space)?),
        PolicySpec::Constant(Some(act)) => Box::new(Constant::new(act.to_act(action_space)?)),
        PolicySpec::Cycle => Box::new(Cycle::new(action_space)?),
        PolicySpec::Scripted(path) => Box::new(Scripted::build_from_path(path)?.fit(action_space)?),
        PolicySpec::Pretrained(name) => {
            bail!("Pretrained policy {} is loaded with its environment", name)
        }
    };
    log::info!("Policy: {}", policy.name());
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thesis_data_core::dummy::{DummyEnv, DummyEnvConfig};

    #[test]
    fn test_build_policy() -> Result<()> {
        let env = DummyEnv::build(&DummyEnvConfig::default().n_actions(3), 0)?;
        let space = env.action_space();

        let mut policy = build_policy::<DummyEnv>(&"cycle".parse()?, &space, 0)?;
        let dummy = ArrayObs(ndarray::ArrayD::zeros(vec![1]));
        let acts = (0..4)
            .map(|_| policy.sample(&dummy))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(
            acts,
            vec![0i64, 1, 2, 0].into_iter().map(GymAct::Discrete).collect::<Vec<_>>()
        );
        assert!(policy.name().ends_with("Cycle"));

        let mut policy = build_policy::<DummyEnv>(&"uniform".parse()?, &space, 0)?;
        assert!(space.contains(&policy.sample(&dummy)?));

        assert!(build_policy::<DummyEnv>(&"stable_baselines3.PPO".parse()?, &space, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_build_scripted_on_box() -> Result<()> {
        let dir = tempdir::TempDir::new("build_policy")?;
        let path = dir.path().join("script.yaml");
        std::fs::write(&path, "actions: [[0.1, 0.2, 0.3, 0.4]]\n")?;
        let spec = PolicySpec::Scripted(path);

        let space = Space::uniform_box(&[2, 2], -1.0, 1.0);
        let mut policy = build_policy::<DummyEnv>(&spec, &space, 0)?;
        let dummy = ArrayObs(ndarray::ArrayD::zeros(vec![1]));
        assert!(space.contains(&policy.sample(&dummy)?));

        assert!(build_policy::<DummyEnv>(&spec, &Space::uniform_box(&[3], -1.0, 1.0), 0).is_err());
        Ok(())
    }
}
