//! Download of datasets from Kaggle.
use anyhow::{bail, Context, Result};
use log::info;
use serde::Deserialize;
use std::{
    fmt,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

/// Base URL of the Kaggle API.
pub const KAGGLE_API: &str = "https://www.kaggle.com/api/v1";

/// Credentials of the Kaggle API.
#[derive(Clone, Deserialize)]
pub struct KaggleCredentials {
    /// User name.
    pub username: String,

    /// API key.
    pub key: String,
}

impl fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"***")
            .finish()
    }
}

impl KaggleCredentials {
    /// Reads credentials from `KAGGLE_USERNAME` and `KAGGLE_KEY`, or else from
    /// `kaggle.json` in `KAGGLE_CONFIG_DIR` or `~/.kaggle`.
    pub fn from_env() -> Result<Self> {
        if let (Ok(username), Ok(key)) = (std::env::var("KAGGLE_USERNAME"), std::env::var("KAGGLE_KEY")) {
            return Ok(Self { username, key });
        }

        let dir = match std::env::var_os("KAGGLE_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("Couldn't find home directory")?
                .join(".kaggle"),
        };
        Self::load(dir.join("kaggle.json"))
    }

    /// Loads credentials from a `kaggle.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Couldn't open Kaggle credentials {:?}", path))?;
        let credentials = serde_json::from_reader(file)
            .with_context(|| format!("Invalid Kaggle credentials {:?}", path))?;
        Ok(credentials)
    }
}

/// Owner and name of a dataset given as `<owner>/<dataset>` or as the URL of its page.
pub fn parse_dataset_url(url: &str) -> Result<(String, String)> {
    let url = url.trim().trim_end_matches('/');
    let path = match url.find("/datasets/") {
        Some(ix) => &url[ix + "/datasets/".len()..],
        None => url,
    };
    let segments = path.split('/').collect::<Vec<_>>();
    match segments.as_slice() {
        [owner, dataset] if !owner.is_empty() && !dataset.is_empty() => {
            Ok((owner.to_string(), dataset.to_string()))
        }
        _ => bail!("Invalid Kaggle dataset {:?}, expected <owner>/<dataset>", url),
    }
}

fn download_dataset(
    client: &reqwest::blocking::Client,
    credentials: &KaggleCredentials,
    owner: &str,
    dataset: &str,
    dest: &Path,
) -> Result<()> {
    let url = format!("{}/datasets/download/{}/{}", KAGGLE_API, owner, dataset);
    info!("Download file from {}", url);
    let response = client
        .get(&url)
        .basic_auth(&credentials.username, Some(&credentials.key))
        .send()?
        .error_for_status()
        .with_context(|| format!("Couldn't download {}/{}", owner, dataset))?;

    let path_zip = dest.with_file_name(format!("{}.zip", dataset));
    if let Some(parent) = path_zip.parent() {
        fs::create_dir_all(parent)?;
    }
    info!("Download file as {:?}", path_zip);
    let content = response.bytes()?;
    let mut zip_file = File::create(&path_zip)?;
    zip_file.write_all(&content)?;
    zip_file.flush()?;

    info!("Extract zip file into {:?}", dest);
    let mut archive = zip::ZipArchive::new(File::open(&path_zip)?)?;
    archive.extract(dest)?;
    fs::remove_file(&path_zip)?;
    Ok(())
}

/// Downloads datasets from Kaggle and extracts them.
///
/// Each dataset `<owner>/<dataset>` is extracted into `<path>/<owner>/<dataset>`.
/// A dataset already there is skipped unless `force` is set.
/// Returns the directories of the datasets.
pub fn download_from_kaggle<P, S>(path: P, urls: &[S], force: bool) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    if urls.is_empty() {
        bail!("At least one download URL must be specified");
    }
    let datasets = urls
        .iter()
        .map(|url| parse_dataset_url(url.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let path = path.as_ref();
    fs::create_dir_all(path)?;
    let credentials = KaggleCredentials::from_env()?;
    let client = reqwest::blocking::Client::new();

    let mut dirs = Vec::with_capacity(datasets.len());
    for (owner, dataset) in datasets.iter() {
        let dest = path.join(owner).join(dataset);
        if dest.exists() && !force {
            info!("{:?} exists, skip download", dest);
        } else {
            if dest.exists() {
                fs::remove_dir_all(&dest)?;
            }
            download_dataset(&client, &credentials, owner, dataset, &dest)?;
        }
        dirs.push(dest);
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_parse_dataset_url() -> Result<()> {
        assert_eq!(
            parse_dataset_url("benedictwilkins/atari-anomaly")?,
            ("benedictwilkins".to_string(), "atari-anomaly".to_string())
        );
        assert_eq!(
            parse_dataset_url("https://www.kaggle.com/datasets/user/data/")?,
            ("user".to_string(), "data".to_string())
        );
        assert!(parse_dataset_url("data").is_err());
        assert!(parse_dataset_url("a/b/c").is_err());
        Ok(())
    }

    #[test]
    fn test_load_credentials() -> Result<()> {
        let dir = TempDir::new("kaggle")?;
        let path = dir.path().join("kaggle.json");
        fs::write(&path, r#"{"username": "user", "key": "secret"}"#)?;
        let credentials = KaggleCredentials::load(&path)?;
        assert_eq!(credentials.username, "user");
        assert!(!format!("{:?}", credentials).contains("secret"));
        Ok(())
    }

    #[test]
    fn test_no_urls() -> Result<()> {
        let dir = TempDir::new("kaggle")?;
        assert!(download_from_kaggle::<_, &str>(dir.path(), &[], false).is_err());
        assert!(download_from_kaggle(dir.path(), &["not-a-dataset"], false).is_err());
        Ok(())
    }
}
