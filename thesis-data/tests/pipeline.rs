use anyhow::Result;
use flate2::{write::GzEncoder, Compression};
use serde_json::json;
use std::{fs::File, io::Write, path::Path};
use tempdir::TempDir;
use thesis_data::{run, GenerateConfig};
use thesis_data_dataset::{
    resolve_splits, Column, DataSplit, Episode, Meta, SplitFractions, WriteMode, META_FILE,
};

const ROWS: u32 = 8;
const COLS: u32 = 8;

fn write_gz(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(())
}

/// Writes a tiny training split of MNIST in the IDX format.
fn write_mnist(dir: &Path) -> Result<()> {
    let labels = [0u8, 1, 2, 0, 1, 2];
    let n = labels.len() as u32;

    let mut images = vec![];
    for v in [0x0000_0803u32, n, ROWS, COLS] {
        images.extend_from_slice(&v.to_be_bytes());
    }
    images.extend((0..n * ROWS * COLS).map(|i| (i * 7 % 256) as u8));
    write_gz(&dir.join("train-images-idx3-ubyte.gz"), &images)?;

    let mut bytes = vec![];
    for v in [0x0000_0801u32, n] {
        bytes.extend_from_slice(&v.to_be_bytes());
    }
    bytes.extend_from_slice(&labels);
    write_gz(&dir.join("train-labels-idx1-ubyte.gz"), &bytes)?;
    Ok(())
}

fn mnist_config(tmp: &TempDir) -> Result<GenerateConfig> {
    let data_dir = tmp.path().join("mnist");
    std::fs::create_dir_all(&data_dir)?;
    write_mnist(&data_dir)?;

    Ok(GenerateConfig::new("MNIST-v0")
        .root(tmp.path().join("data"))
        .kwargs(json!({
            "data_dir": data_dir,
            "num_actions": 2,
            "max_episode_length": 5,
        }))
        .seed(1))
}

#[test]
fn test_generate_mnist() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new("pipeline")?;
    let config = mnist_config(&tmp)?.num_episodes(2);

    let generated = run(&config)?;
    let expected = tmp.path().join("data").join("MNIST-v0").join("uniform");
    assert_eq!(generated.path, expected);
    assert_eq!(
        generated.episodes,
        vec![expected.join("00000000"), expected.join("00000001")]
    );

    let meta = Meta::load(expected.join(META_FILE))?;
    assert_eq!(meta, generated.meta);
    assert_eq!(meta.spec.env_id, "MNIST-v0");
    assert_eq!(meta.mode.as_deref(), Some("sard"));
    assert_eq!(meta.num_episodes, Some(2));
    assert!(meta.policy.is_some());
    assert_eq!(meta.observation_space.shape(), vec![1, ROWS as usize, COLS as usize]);

    for dir in generated.episodes.iter() {
        let episode = Episode::load(dir)?;
        assert_eq!(episode.len(), 5);
        let names = episode.fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["state", "action", "reward", "done"]);

        match episode.column("state") {
            Some(Column::Float32(x)) => {
                assert_eq!(x.shape(), &[5, 1, ROWS as usize, COLS as usize]);
                assert!(x.iter().all(|v| (0.0..=1.0).contains(v)));
            }
            c => panic!("Unexpected state column {:?}", c),
        }
        match episode.column("done") {
            Some(Column::Bool(done)) => assert_eq!(done, &vec![false, false, false, false, true]),
            c => panic!("Unexpected done column {:?}", c),
        }
    }
    Ok(())
}

#[test]
fn test_append_and_overwrite() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new("pipeline")?;
    let config = mnist_config(&tmp)?.path("mnist/{mode}").mode("sa").num_episodes(2);

    run(&config)?;
    let generated = run(&config.clone().write_mode(WriteMode::Append).num_episodes(1))?;
    assert_eq!(generated.episodes, vec![generated.path.join("00000002")]);
    assert_eq!(generated.meta.num_episodes, Some(3));
    assert!(generated.path.ends_with("mnist/sa"));

    let generated = run(&config.num_episodes(1))?;
    assert_eq!(generated.meta.num_episodes, Some(1));
    assert!(generated.path.join("00000000").is_dir());
    assert!(!generated.path.join("00000001").exists());
    Ok(())
}

#[test]
fn test_anomaly_injection() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new("pipeline")?;
    let config = mnist_config(&tmp)?.mode("s").anomaly("mask", 1.0);

    let generated = run(&config)?;
    assert_eq!(
        generated.meta.transforms,
        vec!["AnomalyInjection(RandomMask)".to_string()]
    );

    let episode = Episode::load(&generated.episodes[0])?;
    match episode.column("anomaly") {
        Some(Column::Bool(anomaly)) => assert!(anomaly.iter().all(|a| *a)),
        c => panic!("Unexpected anomaly column {:?}", c),
    }
    Ok(())
}

#[test]
fn test_splits() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new("pipeline")?;
    let config = mnist_config(&tmp)?;

    let train = run(&config.clone().split(Some(DataSplit::Train)).num_episodes(2))?;
    let test = run(&config.split(Some(DataSplit::Test)).num_episodes(1))?;
    assert!(train.path.ends_with("uniform/train"));
    assert!(test.path.ends_with("uniform/test"));

    let dataset = tmp.path().join("data").join("MNIST-v0").join("uniform");
    let splits = resolve_splits(&dataset, &SplitFractions::default())?;
    assert_eq!(splits.train, train.episodes);
    assert!(splits.validate.is_empty());
    assert_eq!(splits.test, test.episodes);
    Ok(())
}

#[test]
fn test_unknown_anomaly() -> Result<()> {
    let tmp = TempDir::new("pipeline")?;
    let config = mnist_config(&tmp)?.anomaly("no_such_anomaly", 0.5);
    assert!(run(&config).is_err());
    Ok(())
}
