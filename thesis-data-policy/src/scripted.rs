//! Policy replaying a list of actions.
use anyhow::{bail, Context, Result};
use ndarray::{Array1, ArrayD};
use serde::{Deserialize, Serialize};
use thesis_data_core::{Configurable, Env, GymAct, Policy, Space};

/// An action as written in a script.
///
/// Discrete actions are integers, continuous actions are lists of numbers
/// reshaped to the action space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptedAct {
    /// Discrete action.
    Discrete(i64),

    /// Flattened continuous action.
    Continuous(Vec<f32>),
}

impl ScriptedAct {
    /// Converts into an action of the given space.
    pub fn to_act(&self, space: &Space) -> Result<GymAct> {
        fit_act(self.clone().into_act(), space)
    }

    fn into_act(self) -> GymAct {
        match self {
            Self::Discrete(a) => GymAct::Discrete(a),
            Self::Continuous(v) => GymAct::Continuous(Array1::from(v).into_dyn()),
        }
    }
}

// Reshapes continuous actions to the box and fills a box with an integer.
fn fit_act(act: GymAct, space: &Space) -> Result<GymAct> {
    let act = match (act, space) {
        (GymAct::Continuous(a), Space::Box { shape, .. }) => {
            let len = a.len();
            match a.into_shape(shape.clone()) {
                Ok(a) => GymAct::Continuous(a),
                Err(_) => bail!("Action of {} elements does not fit {:?}", len, space),
            }
        }
        (GymAct::Discrete(a), Space::Box { shape, .. }) => {
            GymAct::Continuous(ArrayD::from_elem(shape.clone(), a as f32))
        }
        (act, _) => act,
    };
    if !space.contains(&act) {
        bail!("Action {:?} does not fit {:?}", act, space);
    }
    Ok(act)
}

/// Configuration of [`Scripted`].
///
/// ```yaml
/// actions: [0, 1, 1, 0]
/// repeat: true
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptedConfig {
    /// Actions, in order.
    pub actions: Vec<ScriptedAct>,

    /// If `true`, the script starts over after the last action.
    #[serde(default)]
    pub repeat: bool,
}

/// Replays the actions of a script, ignoring observations.
///
/// Continuous actions are one dimensional until the policy is fitted to an
/// action space with [`Scripted::fit`].
pub struct Scripted {
    actions: Vec<GymAct>,
    repeat: bool,
    ix: usize,
}

impl Configurable for Scripted {
    type Config = ScriptedConfig;

    fn build(config: Self::Config) -> Self {
        Self {
            actions: config.actions.into_iter().map(ScriptedAct::into_act).collect(),
            repeat: config.repeat,
            ix: 0,
        }
    }
}

impl Scripted {
    /// Converts the actions of the script into actions of `space`.
    ///
    /// Fails if an action does not fit the space.
    pub fn fit(mut self, space: &Space) -> Result<Self> {
        self.actions = self
            .actions
            .into_iter()
            .enumerate()
            .map(|(i, act)| fit_act(act, space).with_context(|| format!("Scripted action {}", i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self)
    }
}

impl<E: Env<Act = GymAct>> Policy<E> for Scripted {
    fn sample(&mut self, _obs: &E::Obs) -> Result<GymAct> {
        if self.ix >= self.actions.len() {
            if !self.repeat || self.actions.is_empty() {
                bail!("Script exhausted after {} actions", self.ix);
            }
            self.ix = 0;
        }
        let act = self.actions[self.ix].clone();
        self.ix += 1;
        Ok(act)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;
    use thesis_data_core::{dummy::DummyEnv, ArrayObs};

    #[test]
    fn test_scripted_from_yaml() -> Result<()> {
        let dir = TempDir::new("scripted")?;
        let path = dir.path().join("script.yaml");
        std::fs::write(&path, "actions: [1, 0]\nrepeat: true\n")?;

        let mut policy = Scripted::build_from_path(&path)?;
        let obs = ArrayObs(ArrayD::zeros(vec![1]));
        let acts = (0..3)
            .map(|_| Policy::<DummyEnv>::sample(&mut policy, &obs))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(
            acts,
            vec![GymAct::Discrete(1), GymAct::Discrete(0), GymAct::Discrete(1)]
        );
        Ok(())
    }

    #[test]
    fn test_script_exhausted() -> Result<()> {
        let mut policy = Scripted::build(ScriptedConfig {
            actions: vec![ScriptedAct::Continuous(vec![0.5, 0.5])],
            repeat: false,
        });
        let obs = ArrayObs(ArrayD::zeros(vec![1]));
        assert!(Policy::<DummyEnv>::sample(&mut policy, &obs).is_ok());
        assert!(Policy::<DummyEnv>::sample(&mut policy, &obs).is_err());
        Ok(())
    }

    #[test]
    fn test_to_act() -> Result<()> {
        let space = Space::uniform_box(&[2], -1.0, 1.0);
        let act = ScriptedAct::Continuous(vec![0.1, 0.2]).to_act(&space)?;
        assert!(space.contains(&act));
        assert!(ScriptedAct::Continuous(vec![0.1]).to_act(&Space::discrete(2)).is_err());
        Ok(())
    }

    #[test]
    fn test_fit_to_box() -> Result<()> {
        let space = Space::uniform_box(&[2, 2], -1.0, 1.0);
        let config: ScriptedConfig = serde_yaml::from_str("actions: [[0.1, 0.2, 0.3, 0.4], 1]\n")?;
        let mut policy = Scripted::build(config).fit(&space)?;
        let obs = ArrayObs(ArrayD::zeros(vec![1]));
        for _ in 0..2 {
            let act = Policy::<DummyEnv>::sample(&mut policy, &obs)?;
            assert!(space.contains(&act));
        }

        let config: ScriptedConfig = serde_yaml::from_str("actions: [[0.1, 0.2, 0.3]]\n")?;
        assert!(Scripted::build(config).fit(&space).is_err());
        let config: ScriptedConfig = serde_yaml::from_str("actions: [0, 2]\n")?;
        assert!(Scripted::build(config).fit(&Space::discrete(2)).is_err());
        Ok(())
    }
}
