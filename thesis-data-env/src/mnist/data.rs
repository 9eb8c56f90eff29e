//! MNIST images and labels.
//!
//! The data are read from gzipped IDX files. Missing files are downloaded
//! from [`MNIST_MIRROR`]. Each split is parsed once per process per directory.
use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use log::info;
use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// Base URL from which the MNIST files are downloaded.
pub const MNIST_MIRROR: &str = "https://ossci-datasets.s3.amazonaws.com/mnist/";

const IDX_IMAGES_MAGIC: u32 = 0x0000_0803;
const IDX_LABELS_MAGIC: u32 = 0x0000_0801;

static CACHE: Lazy<Mutex<HashMap<(PathBuf, bool), Arc<MnistData>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Images and labels of a split of MNIST.
pub struct MnistData {
    images: Vec<u8>,
    labels: Vec<u8>,
    rows: usize,
    cols: usize,
}

impl fmt::Debug for MnistData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MnistData")
            .field("len", &self.len())
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl MnistData {
    /// Constructs the data from raw pixels, stored image after image in row-major order.
    pub fn new(images: Vec<u8>, labels: Vec<u8>, rows: usize, cols: usize) -> Result<Self> {
        if images.len() != labels.len() * rows * cols {
            bail!(
                "{} pixels do not match {} images of {}x{}",
                images.len(),
                labels.len(),
                rows,
                cols
            );
        }
        Ok(Self {
            images,
            labels,
            rows,
            cols,
        })
    }

    /// Loads a split from the given directory, downloading missing files.
    ///
    /// The loaded data are cached.
    pub fn load(dir: impl AsRef<Path>, train: bool) -> Result<Arc<Self>> {
        let key = (dir.as_ref().to_path_buf(), train);
        let mut cache = CACHE
            .lock()
            .map_err(|_| anyhow::anyhow!("MNIST cache is poisoned"))?;
        if let Some(data) = cache.get(&key) {
            return Ok(data.clone());
        }

        let (images_file, labels_file) = match train {
            true => ("train-images-idx3-ubyte.gz", "train-labels-idx1-ubyte.gz"),
            false => ("t10k-images-idx3-ubyte.gz", "t10k-labels-idx1-ubyte.gz"),
        };
        let images = read_gz(&fetch(dir.as_ref(), images_file)?)?;
        let labels = read_gz(&fetch(dir.as_ref(), labels_file)?)?;
        let (rows, cols, images) = parse_idx_images(&images)?;
        let labels = parse_idx_labels(&labels)?;
        let data = Arc::new(Self::new(images, labels, rows, cols)?);
        info!("Loaded {} MNIST images from {:?}", data.len(), dir.as_ref());

        cache.insert(key, data.clone());
        Ok(data)
    }

    /// The number of images.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if there is no image.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Height and width of images.
    pub fn image_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Pixels of the `i`-th image.
    pub fn image(&self, i: usize) -> &[u8] {
        let size = self.rows * self.cols;
        &self.images[i * size..(i + 1) * size]
    }

    /// Label of the `i`-th image.
    pub fn label(&self, i: usize) -> u8 {
        self.labels[i]
    }

    /// Indices of images grouped by label, for labels `0..=max label`.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let n_groups = self.labels.iter().max().map_or(0, |m| *m as usize + 1);
        let mut groups = vec![vec![]; n_groups];
        for (i, label) in self.labels.iter().enumerate() {
            groups[*label as usize].push(i);
        }
        groups
    }
}

/// Returns the path of a file in `dir`, downloading it if it does not exist.
fn fetch(dir: &Path, file: &str) -> Result<PathBuf> {
    let path = dir.join(file);
    if path.exists() {
        return Ok(path);
    }

    std::fs::create_dir_all(dir).context(format!("Failed to create directory {:?}", dir))?;
    let url = format!("{}{}", MNIST_MIRROR, file);
    info!("Download file from {:?}", url);
    let response = reqwest::blocking::get(&url)?.error_for_status()?;
    let content = response.bytes()?;

    let mut f = File::create(&path).context(format!("Failed to create file {:?}", path))?;
    f.write_all(&content)?;
    f.flush()?;
    info!("Downloaded file as {:?}", path);
    Ok(path)
}

fn read_gz(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).context(format!("Failed to open {:?}", path))?;
    let mut bytes = vec![];
    GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .context(format!("Failed to decompress {:?}", path))?;
    Ok(bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    match bytes.get(offset..offset + 4) {
        Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => bail!("IDX header is truncated"),
    }
}

/// Parses an IDX image file, returning the height, width and pixels.
fn parse_idx_images(bytes: &[u8]) -> Result<(usize, usize, Vec<u8>)> {
    let magic = read_u32(bytes, 0)?;
    if magic != IDX_IMAGES_MAGIC {
        bail!("Unexpected magic number {:#010x} of IDX images", magic);
    }
    let n = read_u32(bytes, 4)? as usize;
    let rows = read_u32(bytes, 8)? as usize;
    let cols = read_u32(bytes, 12)? as usize;
    let pixels = &bytes[16..];
    if pixels.len() != n * rows * cols {
        bail!("IDX images have {} bytes, expected {}", pixels.len(), n * rows * cols);
    }
    Ok((rows, cols, pixels.to_vec()))
}

fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let magic = read_u32(bytes, 0)?;
    if magic != IDX_LABELS_MAGIC {
        bail!("Unexpected magic number {:#010x} of IDX labels", magic);
    }
    let n = read_u32(bytes, 4)? as usize;
    let labels = &bytes[8..];
    if labels.len() != n {
        bail!("IDX labels have {} bytes, expected {}", labels.len(), n);
    }
    Ok(labels.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use tempdir::TempDir;

    fn idx_images(n: u32, rows: u32, cols: u32) -> Vec<u8> {
        let mut bytes = vec![];
        for v in [IDX_IMAGES_MAGIC, n, rows, cols] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.extend((0..n * rows * cols).map(|i| (i % 256) as u8));
        bytes
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut bytes = vec![];
        for v in [IDX_LABELS_MAGIC, labels.len() as u32] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.extend_from_slice(labels);
        bytes
    }

    fn write_gz(path: &Path, bytes: &[u8]) -> Result<()> {
        let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?;
        Ok(())
    }

    #[test]
    fn test_parse_idx() -> Result<()> {
        let (rows, cols, pixels) = parse_idx_images(&idx_images(3, 2, 2))?;
        assert_eq!((rows, cols, pixels.len()), (2, 2, 12));
        assert_eq!(parse_idx_labels(&idx_labels(&[1, 2]))?, vec![1, 2]);
        assert!(parse_idx_labels(&idx_images(1, 1, 1)).is_err());
        assert!(parse_idx_images(&[0, 0]).is_err());
        Ok(())
    }

    #[test]
    fn test_load_from_directory() -> Result<()> {
        let dir = TempDir::new("mnist")?;
        write_gz(&dir.path().join("t10k-images-idx3-ubyte.gz"), &idx_images(4, 2, 3))?;
        write_gz(&dir.path().join("t10k-labels-idx1-ubyte.gz"), &idx_labels(&[0, 1, 0, 2]))?;

        let data = MnistData::load(dir.path(), false)?;
        assert_eq!(data.len(), 4);
        assert_eq!(data.image_shape(), (2, 3));
        assert_eq!(data.image(1), &[6, 7, 8, 9, 10, 11]);
        assert_eq!(data.groups(), vec![vec![0, 2], vec![1], vec![3]]);

        // cached
        let data_ = MnistData::load(dir.path(), false)?;
        assert!(Arc::ptr_eq(&data, &data_));
        Ok(())
    }

    #[test]
    fn test_new_checks_size() {
        assert!(MnistData::new(vec![0; 5], vec![0], 2, 2).is_err());
        assert!(MnistData::new(vec![0; 4], vec![0], 2, 2).is_ok());
    }
}
