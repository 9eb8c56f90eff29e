//! Dataset paths given by templates.
use crate::DataSplit;
use anyhow::{bail, Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Default root directory of datasets, `~/.data`.
pub fn default_root() -> Result<PathBuf> {
    let mut dir = dirs::home_dir().context("Couldn't find home directory")?;
    dir.push(".data");
    Ok(dir)
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().context("Couldn't find home directory")?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// The short name of a policy used in paths: the last segment of its name, lower-cased.
///
/// `gymu.policy.Uniform` and `thesis_data_policy::uniform::Uniform` both become `uniform`.
pub fn policy_short_name(name: &str) -> String {
    name.rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(name)
        .to_lowercase()
}

/// Template of a dataset path.
///
/// The placeholders `{env_id}`, `{policy}`, `{mode}` and `{split}` are
/// replaced by their values. A relative path is placed under the root
/// directory.
///
/// ```
/// use thesis_data_dataset::{DataSplit, PathTemplate};
///
/// let path = PathTemplate::new("{env_id}/{policy}")
///     .root("/data")
///     .env_id("CartPole-v1")
///     .policy("gymu.policy.Uniform")
///     .split(Some(DataSplit::Train))
///     .resolve()
///     .unwrap();
/// assert_eq!(path, std::path::PathBuf::from("/data/CartPole-v1/uniform/train"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PathTemplate {
    template: String,
    root: Option<PathBuf>,
    env_id: Option<String>,
    policy: Option<String>,
    mode: Option<String>,
    split: Option<DataSplit>,
}

impl PathTemplate {
    /// Constructs a template.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            root: None,
            env_id: None,
            policy: None,
            mode: None,
            split: None,
        }
    }

    /// Sets the root directory of relative paths. Defaults to [`default_root`].
    pub fn root(mut self, v: impl Into<PathBuf>) -> Self {
        self.root = Some(v.into());
        self
    }

    /// Sets the environment id.
    pub fn env_id(mut self, v: impl Into<String>) -> Self {
        self.env_id = Some(v.into());
        self
    }

    /// Sets the policy, from its full or short name.
    pub fn policy(mut self, v: impl AsRef<str>) -> Self {
        self.policy = Some(policy_short_name(v.as_ref()));
        self
    }

    /// Sets the recording mode.
    pub fn mode(mut self, v: impl Into<String>) -> Self {
        self.mode = Some(v.into());
        self
    }

    /// Sets the data split.
    ///
    /// If the template has no `{split}`, the directory of the split is appended.
    pub fn split(mut self, v: Option<DataSplit>) -> Self {
        self.split = v;
        self
    }

    /// Resolves the path.
    pub fn resolve(&self) -> Result<PathBuf> {
        let split = self.split.map(|s| s.dir_name().to_string());
        let vars = [
            ("{env_id}", &self.env_id),
            ("{policy}", &self.policy),
            ("{mode}", &self.mode),
            ("{split}", &split),
        ];

        let mut path = self.template.clone();
        for (key, value) in vars.iter() {
            if !path.contains(key) {
                continue;
            }
            match value {
                Some(v) => path = path.replace(key, v),
                None => bail!("No value for {} in path template {:?}", key, self.template),
            }
        }
        if let Some(start) = path.find('{') {
            if path[start..].contains('}') {
                bail!("Unknown placeholder in path template {:?}", self.template);
            }
        }

        let mut path = expand_home(&path)?;
        if path.is_relative() {
            let root = match &self.root {
                Some(root) => expand_home(root)?,
                None => default_root()?,
            };
            path = root.join(path);
        }
        if let (Some(split), false) = (split, self.template.contains("{split}")) {
            path.push(split);
        }
        debug!("Dataset path: {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() -> Result<()> {
        let template = PathTemplate::new("{env_id}/{policy}/{mode}")
            .root("/data")
            .env_id("MNIST-v0")
            .policy("thesis_data_policy::uniform::Uniform")
            .mode("sard");
        assert_eq!(template.resolve()?, PathBuf::from("/data/MNIST-v0/uniform/sard"));

        let path = template.clone().split(Some(DataSplit::Validate)).resolve()?;
        assert_eq!(path, PathBuf::from("/data/MNIST-v0/uniform/sard/validate"));

        let path = PathTemplate::new("/tmp/{split}/{env_id}")
            .env_id("CartPole-v1")
            .split(Some(DataSplit::Test))
            .resolve()?;
        assert_eq!(path, PathBuf::from("/tmp/test/CartPole-v1"));
        Ok(())
    }

    #[test]
    fn test_missing_or_unknown_placeholder() {
        assert!(PathTemplate::new("{env_id}/{policy}").root("/data").env_id("a").resolve().is_err());
        assert!(PathTemplate::new("{env}/x").root("/data").resolve().is_err());
    }

    #[test]
    fn test_policy_short_name() {
        assert_eq!(policy_short_name("gymu.policy.Uniform"), "uniform");
        assert_eq!(policy_short_name("stable_baselines3.PPO"), "ppo");
        assert_eq!(policy_short_name("cycle"), "cycle");
    }
}
