//! Locating episodes and linking datasets together.
use crate::{find_episodes, path::expand_home, INDEX_FILE};
use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link)
    } else {
        std::os::windows::fs::symlink_file(original, link)
    }
}

fn resolve_existing(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = expand_home(path)?;
    fs::canonicalize(&path).with_context(|| format!("Path {:?} does not exist", path))
}

/// Episode directories of a list of base paths.
///
/// A base path is either an episode directory itself or a directory
/// searched for episodes at any depth.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeResolver {
    base: Vec<PathBuf>,
}

impl EpisodeResolver {
    /// Constructs a resolver. Every base path must exist.
    pub fn new<P: AsRef<Path>>(base: impl IntoIterator<Item = P>) -> Result<Self> {
        let base = base
            .into_iter()
            .map(|p| resolve_existing(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { base })
    }

    /// Links `alias` to `base`, then constructs a resolver of `base`.
    ///
    /// Fails if `base` does not exist or `alias` already exists.
    pub fn symlinked(base: impl AsRef<Path>, alias: impl AsRef<Path>) -> Result<Self> {
        let base = resolve_existing(base).context("Couldn't create symlink")?;
        let alias = expand_home(alias)?;
        if fs::symlink_metadata(&alias).is_ok() {
            bail!("Path {:?} already exists, couldn't create symlink", alias);
        }
        if let Some(parent) = alias.parent() {
            fs::create_dir_all(parent)?;
        }
        symlink(&base, &alias)?;
        info!("Linked {:?} -> {:?}", alias, base);
        Ok(Self { base: vec![base] })
    }

    /// Base paths.
    pub fn base(&self) -> &[PathBuf] {
        &self.base
    }

    /// Episode directories, sorted within each base path.
    pub fn episodes(&self) -> Vec<PathBuf> {
        let mut episodes = vec![];
        for base in self.base.iter() {
            if base.join(INDEX_FILE).is_file() {
                episodes.push(base.clone());
            } else {
                episodes.extend(find_episodes(base));
            }
        }
        episodes
    }
}

fn common_ancestor(paths: &[PathBuf]) -> PathBuf {
    let mut common: Vec<Component> = match paths.first().and_then(|p| p.parent()) {
        Some(parent) => parent.components().collect(),
        None => return PathBuf::new(),
    };
    for path in paths.iter().skip(1) {
        let parent = path.parent().map(|p| p.components().collect::<Vec<_>>()).unwrap_or_default();
        let n = common
            .iter()
            .zip(parent.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(n);
    }
    common.iter().collect()
}

/// Links each of `paths` into the directory `base` and returns the links.
///
/// A link is placed at the path of its target relative to the common
/// ancestor of all targets, e.g., `a/x/train` and `a/y/train` are linked as
/// `base/x/train` and `base/y/train`. `base` is created if needed. With
/// `force`, symbolic links already under `base`, at any depth, are removed
/// first.
///
/// Fails if any of `paths` does not exist.
pub fn symlinked<B, P>(base: B, paths: &[P], force: bool) -> Result<Vec<PathBuf>>
where
    B: AsRef<Path>,
    P: AsRef<Path>,
{
    if paths.is_empty() {
        return Ok(vec![]);
    }

    let base = expand_home(base)?;
    fs::create_dir_all(&base)?;
    let base = fs::canonicalize(&base)?;
    let paths = paths
        .iter()
        .map(|p| resolve_existing(p).context("Path must exist to create symlink"))
        .collect::<Result<Vec<_>>>()?;

    if force {
        let links = WalkDir::new(&base)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path_is_symlink())
            .map(|e| e.into_path())
            .collect::<Vec<_>>();
        for link in links {
            debug!("Remove link {:?}", link);
            fs::remove_file(&link)?;
        }
    }

    let ancestor = common_ancestor(&paths);
    let mut links = Vec::with_capacity(paths.len());
    for path in paths.iter() {
        let relative = path.strip_prefix(&ancestor)?;
        let link = base.join(relative);
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent)?;
        }
        symlink(path, &link).with_context(|| format!("Couldn't link {:?} -> {:?}", link, path))?;
        debug!("Linked {:?} -> {:?}", link, path);
        links.push(link);
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn make_episode(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(INDEX_FILE), "length: 0\nfields: []\n")?;
        Ok(())
    }

    #[test]
    fn test_resolver() -> Result<()> {
        let dir = TempDir::new("resolver")?;
        let root = fs::canonicalize(dir.path())?;
        make_episode(&root.join("a/00000000"))?;
        make_episode(&root.join("a/00000001"))?;
        make_episode(&root.join("b"))?;

        let resolver = EpisodeResolver::new([root.join("a"), root.join("b")])?;
        assert_eq!(
            resolver.episodes(),
            vec![root.join("a/00000000"), root.join("a/00000001"), root.join("b")]
        );
        assert!(EpisodeResolver::new([root.join("missing")]).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_resolver() -> Result<()> {
        let dir = TempDir::new("resolver")?;
        let root = fs::canonicalize(dir.path())?;
        make_episode(&root.join("data/00000000"))?;

        let resolver = EpisodeResolver::symlinked(root.join("data"), root.join("alias"))?;
        assert_eq!(resolver.episodes().len(), 1);
        assert!(fs::symlink_metadata(root.join("alias"))?.file_type().is_symlink());
        assert!(EpisodeResolver::symlinked(root.join("data"), root.join("alias")).is_err());
        assert!(EpisodeResolver::symlinked(root.join("none"), root.join("alias2")).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new("symlinked")?;
        let root = fs::canonicalize(dir.path())?;
        make_episode(&root.join("kaggle/x/train/00000000"))?;
        make_episode(&root.join("kaggle/y/train/00000000"))?;

        let targets = [root.join("kaggle/x/train"), root.join("kaggle/y/train")];
        let links = symlinked(root.join("train"), &targets, true)?;
        assert_eq!(links, vec![root.join("train/x/train"), root.join("train/y/train")]);
        assert_eq!(find_episodes(root.join("train")).len(), 2);

        // a single target is linked by its name; force clears the old links
        let links = symlinked(root.join("test"), &[root.join("kaggle/x/train")], true)?;
        assert_eq!(links, vec![root.join("test/train")]);
        assert!(symlinked(root.join("test"), &[root.join("kaggle/x/train")], false).is_err());
        let links = symlinked(root.join("test"), &[root.join("kaggle/y/train")], true)?;
        assert_eq!(links, vec![root.join("test/train")]);
        assert_eq!(fs::read_link(&links[0])?, root.join("kaggle/y/train"));

        assert!(symlinked(root.join("v"), &[root.join("missing")], true).is_err());
        assert!(symlinked::<_, PathBuf>(root.join("w"), &[], true)?.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_again_with_force() -> Result<()> {
        let dir = TempDir::new("symlinked")?;
        let root = fs::canonicalize(dir.path())?;
        make_episode(&root.join("kaggle/x/train/00000000"))?;
        make_episode(&root.join("kaggle/y/train/00000000"))?;

        let targets = [root.join("kaggle/x/train"), root.join("kaggle/y/train")];
        let first = symlinked(root.join("train"), &targets, true)?;
        let second = symlinked(root.join("train"), &targets, true)?;
        assert_eq!(first, second);
        assert_eq!(find_episodes(root.join("train")).len(), 2);
        assert!(symlinked(root.join("train"), &targets, false).is_err());
        Ok(())
    }
}
