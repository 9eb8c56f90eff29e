//! Trajectory datasets on disk.
//!
//! A dataset is a directory of episodes written by [`DatasetWriter`], one
//! subdirectory per episode, and a [`Meta`] file describing the environment,
//! the policy and the recording mode:
//!
//! ```text
//! ~/.data/CartPole-v1/uniform/
//! ├── 00000000/
//! │   ├── episode.yaml
//! │   ├── state.bin
//! │   └── ...
//! ├── 00000001/
//! └── meta.yaml
//! ```
//!
//! Dataset paths are given by a [`PathTemplate`]. Consumers of datasets find
//! episodes with [`resolve_splits`] or [`EpisodeResolver`], read them with
//! [`Episode::load`], and get the environment metadata with
//! [`configure_environment`], which can also fetch datasets from Kaggle.
mod configure;
mod episode;
mod kaggle;
mod meta;
mod path;
mod resolver;
mod split;
mod writer;
pub use configure::{configure_environment, EnvironmentConfig, KaggleConfig, OneOrMany};
pub use episode::{
    record_value_from_yaml, Column, Episode, EpisodeIndex, FieldInfo, FieldKind, INDEX_FILE,
};
pub use kaggle::{download_from_kaggle, parse_dataset_url, KaggleCredentials, KAGGLE_API};
pub use meta::{Meta, META_FILE};
pub use path::{default_root, expand_home, policy_short_name, PathTemplate};
pub use resolver::{symlinked, EpisodeResolver};
pub use split::{find_episodes, resolve_splits, DataSplit, SplitFractions, Splits};
pub use writer::{episode_dir_name, episode_dirs, parse_episode_dir_name, DatasetWriter, WriteMode};
