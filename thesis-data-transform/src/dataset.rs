//! Transforms of the records of particular datasets.
use crate::{record::map_field, RecordTransform};
use anyhow::Result;
use thesis_data_core::{record::Record, Field};

/// A transform of the records of datasets of one environment.
#[derive(Clone, Debug)]
pub struct DatasetTransform {
    name: &'static str,
    f: fn(Record) -> Result<Record>,
}

impl RecordTransform for DatasetTransform {
    fn apply(&mut self, record: Record) -> Result<Record> {
        (self.f)(record)
    }

    fn name(&self) -> String {
        self.name.to_string()
    }
}

/// Returns the transform for the datasets of an environment, if it has one.
pub fn dataset_transform(env_id: &str) -> Option<DatasetTransform> {
    match env_id {
        "SpaceInvadersNoFrameSkip-v0" => Some(DatasetTransform {
            name: "SpaceInvaders",
            f: space_invaders,
        }),
        _ => None,
    }
}

// Observations of SpaceInvaders are dark, scale them up.
fn space_invaders(record: Record) -> Result<Record> {
    map_field(record, Field::State.key(), |x| {
        Ok(x.mapv(|v| (v / 0.5).clamp(0.0, 1.0)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thesis_data_core::record::RecordValue;

    #[test]
    fn test_space_invaders() -> Result<()> {
        let mut t = dataset_transform("SpaceInvadersNoFrameSkip-v0").unwrap();
        let record = Record::from_slice(&[
            ("state", RecordValue::ArrayD(vec![0.1, 0.4, 0.6], vec![1, 1, 3])),
            ("nextstate", RecordValue::ArrayD(vec![0.6], vec![1, 1, 1])),
        ]);
        let out = t.apply(record)?;
        assert_eq!(out.get_arrayd("state")?.0, vec![0.2, 0.8, 1.0]);
        assert_eq!(out.get_arrayd("nextstate")?.0, vec![0.6]);
        assert!(dataset_transform("MNIST-v0").is_none());
        Ok(())
    }
}
