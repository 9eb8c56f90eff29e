//! Selection of a policy by name.
use crate::ScriptedAct;
use anyhow::{bail, Context, Result};
use std::{fmt, path::PathBuf, str::FromStr};

/// A policy selected by name.
///
/// | name | policy |
/// |---|---|
/// | `uniform`, `random`, `gymu.policy.Uniform` | [`Uniform`](crate::Uniform) |
/// | `constant`, `constant:<action>` | [`Constant`](crate::Constant) |
/// | `cycle` | [`Cycle`](crate::Cycle) |
/// | `scripted:<path to yaml>` | [`Scripted`](crate::Scripted) |
/// | anything containing `stable_baselines3`, e.g., `stable_baselines3.PPO` | pretrained agent |
///
/// The action of a constant policy is written in YAML, e.g., `constant:1` or
/// `constant:[0.0, 0.5]`.
#[derive(Clone, Debug, PartialEq)]
pub enum PolicySpec {
    /// Uniform random policy.
    Uniform,

    /// Constant policy, optionally with its action.
    Constant(Option<ScriptedAct>),

    /// Cycles through discrete actions.
    Cycle,

    /// Replays a script.
    Scripted(PathBuf),

    /// Pretrained agent, with the class name of its algorithm.
    Pretrained(String),
}

impl PolicySpec {
    /// Parses a policy name.
    pub fn parse(name: &str) -> Result<Self> {
        if name.contains("stable_baselines3") {
            return Ok(Self::Pretrained(name.to_string()));
        }

        let (head, arg) = match name.split_once(':') {
            Some((head, arg)) if !arg.starts_with(':') && !head.is_empty() => (head, Some(arg)),
            _ => (name, None),
        };
        let last = last_segment(head).to_lowercase();

        match (last.as_str(), arg) {
            ("uniform" | "random", None) => Ok(Self::Uniform),
            ("constant", None) => Ok(Self::Constant(None)),
            ("constant", Some(arg)) => {
                let act = serde_yaml::from_str(arg)
                    .context(format!("Invalid action of constant policy: {}", arg))?;
                Ok(Self::Constant(Some(act)))
            }
            ("cycle", None) => Ok(Self::Cycle),
            ("scripted", Some(path)) => Ok(Self::Scripted(PathBuf::from(path))),
            ("scripted", None) => bail!("Scripted policy needs a path, e.g., scripted:actions.yaml"),
            _ => bail!("Unknown policy: {}", name),
        }
    }

    /// Short lower-case name of the policy, used in dataset paths.
    ///
    /// For pretrained agents it is the algorithm, e.g., `ppo`.
    pub fn short_name(&self) -> String {
        match self {
            Self::Uniform => "uniform".to_string(),
            Self::Constant(_) => "constant".to_string(),
            Self::Cycle => "cycle".to_string(),
            Self::Scripted(_) => "scripted".to_string(),
            Self::Pretrained(name) => last_segment(name).to_lowercase(),
        }
    }
}

/// The last segment of a dotted or `::`-separated path.
fn last_segment(name: &str) -> &str {
    name.rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(name)
}

impl FromStr for PolicySpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PolicySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scripted(path) => write!(f, "scripted:{}", path.display()),
            Self::Pretrained(name) => f.write_str(name),
            s => f.write_str(&s.short_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() -> Result<()> {
        assert_eq!(PolicySpec::parse("uniform")?, PolicySpec::Uniform);
        assert_eq!(PolicySpec::parse("gymu.policy.Uniform")?, PolicySpec::Uniform);
        assert_eq!(
            PolicySpec::parse("thesis_data_policy::Uniform")?,
            PolicySpec::Uniform
        );
        assert_eq!(PolicySpec::parse("cycle")?, PolicySpec::Cycle);
        assert_eq!(PolicySpec::parse("constant")?, PolicySpec::Constant(None));
        assert_eq!(
            PolicySpec::parse("constant:1")?,
            PolicySpec::Constant(Some(ScriptedAct::Discrete(1)))
        );
        assert_eq!(
            PolicySpec::parse("constant:[0.5, 1.0]")?,
            PolicySpec::Constant(Some(ScriptedAct::Continuous(vec![0.5, 1.0])))
        );
        assert_eq!(
            PolicySpec::parse("scripted:dir/actions.yaml")?,
            PolicySpec::Scripted(PathBuf::from("dir/actions.yaml"))
        );
        assert_eq!(
            PolicySpec::parse("stable_baselines3.PPO")?,
            PolicySpec::Pretrained("stable_baselines3.PPO".to_string())
        );
        assert!(PolicySpec::parse("scripted").is_err());
        assert!(PolicySpec::parse("foo.Bar").is_err());
        Ok(())
    }

    #[test]
    fn test_short_name() -> Result<()> {
        assert_eq!(PolicySpec::parse("gymu.policy.Uniform")?.short_name(), "uniform");
        assert_eq!(PolicySpec::parse("stable_baselines3.PPO")?.short_name(), "ppo");
        assert_eq!(PolicySpec::parse("scripted:a.yaml")?.short_name(), "scripted");
        Ok(())
    }
}
