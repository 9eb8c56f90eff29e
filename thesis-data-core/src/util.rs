//! Utilities for interaction of policies and environments.
use crate::{record::Recorder, Env, EpisodeIterator, Policy};
use anyhow::Result;
use log::debug;

/// Runs episodes and writes their step records to a recorder.
///
/// Returns the length of each episode.
pub fn record_episodes<E, P, R>(
    iterator: &mut EpisodeIterator<E, P>,
    n_episodes: usize,
    recorder: &mut R,
) -> Result<Vec<usize>>
where
    E: Env,
    P: Policy<E>,
    R: Recorder,
{
    let mut lengths = Vec::with_capacity(n_episodes);

    for episode in 0..n_episodes {
        let mut count_step = 0;
        for record in iterator.episode()? {
            recorder.write(record?);
            count_step += 1;
        }
        debug!("Episode {:?}, {:?} steps", episode, count_step);
        lengths.push(count_step);
    }

    Ok(lengths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::{DummyEnv, DummyEnvConfig, DummyPolicy},
        record::BufferedRecorder,
        Mode,
    };

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_record_episodes() -> Result<()> {
        init();

        let env = DummyEnv::build(&DummyEnvConfig::default().episode_length(5), 0)?;
        let mut iterator = EpisodeIterator::new(env, DummyPolicy::new(0), Mode::new("sard")?, 3);
        let mut recorder = BufferedRecorder::new();

        let lengths = record_episodes(&mut iterator, 2, &mut recorder)?;
        assert_eq!(lengths, vec![3, 3]);
        assert_eq!(recorder.len(), 6);
        Ok(())
    }
}
