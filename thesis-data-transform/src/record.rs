//! Transforms of step records.
use crate::{ApplyWithProbability, Transform};
use anyhow::{bail, Result};
use ndarray::{ArrayD, IxDyn};
use rand::{rngs::StdRng, SeedableRng};
use thesis_data_core::{
    error::ThesisDataError,
    record::{Record, RecordValue},
    Field,
};

/// Key of the anomaly label added by [`AnomalyInjection`].
pub const ANOMALY_KEY: &str = "anomaly";

/// A transform of step records, applied before they are written.
pub trait RecordTransform {
    /// Transforms a record.
    fn apply(&mut self, record: Record) -> Result<Record>;

    /// Name of the transform, as listed in dataset metadata.
    fn name(&self) -> String;
}

impl<T: RecordTransform + ?Sized> RecordTransform for Box<T> {
    fn apply(&mut self, record: Record) -> Result<Record> {
        self.as_mut().apply(record)
    }

    fn name(&self) -> String {
        self.as_ref().name()
    }
}

fn get_array(record: &Record, key: &str) -> Result<Option<ArrayD<f32>>> {
    match record.get(key) {
        None => Ok(None),
        Some(RecordValue::ArrayD(data, shape)) => {
            Ok(Some(ArrayD::from_shape_vec(IxDyn(shape), data.clone())?))
        }
        Some(RecordValue::Array1(data)) => {
            Ok(Some(ArrayD::from_shape_vec(IxDyn(&[data.len()]), data.clone())?))
        }
        Some(v) => Err(ThesisDataError::RecordValueTypeError(format!(
            "{} is {}, expected an array",
            key,
            v.type_name()
        ))
        .into()),
    }
}

fn put_array(record: &mut Record, key: &str, x: ArrayD<f32>) {
    let shape = x.shape().to_vec();
    let data = x.iter().copied().collect();
    record.insert(key, RecordValue::ArrayD(data, shape));
}

/// Applies `f` to the array at `key`, if the record has it.
pub(crate) fn map_field<F>(mut record: Record, key: &str, f: F) -> Result<Record>
where
    F: FnOnce(ArrayD<f32>) -> Result<ArrayD<f32>>,
{
    if let Some(x) = get_array(&record, key)? {
        put_array(&mut record, key, f(x)?);
    }
    Ok(record)
}

/// Applies `f` to `state` and `nextstate`, if the record has them.
pub(crate) fn map_states<F>(record: Record, mut f: F) -> Result<Record>
where
    F: FnMut(ArrayD<f32>) -> Result<ArrayD<f32>>,
{
    let record = map_field(record, Field::State.key(), &mut f)?;
    map_field(record, Field::NextState.key(), &mut f)
}

/// Injects anomalies into the `state` of records with a given probability.
///
/// Every record gets a boolean [`ANOMALY_KEY`] field telling whether its state
/// was transformed.
pub struct AnomalyInjection {
    transform: ApplyWithProbability<Box<dyn Transform>>,
    name: String,
    rng: StdRng,
}

impl AnomalyInjection {
    /// Constructs the transform.
    pub fn new(transform: Box<dyn Transform>, prob: f32, seed: u64) -> Self {
        let name = format!("AnomalyInjection({})", transform.name());
        Self {
            transform: ApplyWithProbability::new(transform, prob),
            name,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RecordTransform for AnomalyInjection {
    fn apply(&mut self, mut record: Record) -> Result<Record> {
        let key = Field::State.key();
        let state = match get_array(&record, key)? {
            Some(state) => state,
            None => bail!("Anomalies are injected into the state, which the record does not have"),
        };
        let (state, anomaly) = self.transform.apply(&state, &mut self.rng)?;
        if anomaly {
            log::trace!("{} applied", self.name);
        }
        put_array(&mut record, key, state);
        record.insert(ANOMALY_KEY, RecordValue::Bool(anomaly));
        Ok(record)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RandomBrightness;

    fn record() -> Record {
        Record::from_slice(&[
            ("state", RecordValue::ArrayD(vec![0.5; 4], vec![1, 2, 2])),
            ("reward", RecordValue::Scalar(1.0)),
        ])
    }

    #[test]
    fn test_anomaly_injection() -> Result<()> {
        let t = Box::new(RandomBrightness::new((2.0, 2.0)));
        let mut always = AnomalyInjection::new(t, 1.0, 0);
        assert_eq!(always.name(), "AnomalyInjection(RandomBrightness)");

        let out = always.apply(record())?;
        assert!(out.get_bool(ANOMALY_KEY)?);
        assert_eq!(out.get_arrayd("state")?, (vec![1.0; 4], vec![1, 2, 2]));
        assert_eq!(out.get_scalar("reward")?, 1.0);

        let t = Box::new(RandomBrightness::new((2.0, 2.0)));
        let mut never = AnomalyInjection::new(t, 0.0, 0);
        let out = never.apply(record())?;
        assert!(!out.get_bool(ANOMALY_KEY)?);
        assert_eq!(out.get_arrayd("state")?, (vec![0.5; 4], vec![1, 2, 2]));

        let mut no_state = Record::from_scalar("reward", 0.0);
        no_state.insert("action", RecordValue::Integer(0));
        assert!(never.apply(no_state).is_err());
        Ok(())
    }

    #[test]
    fn test_map_states() -> Result<()> {
        let mut r = record();
        r.insert("nextstate", RecordValue::Array1(vec![1.0, 2.0]));
        let out = map_states(r, |x| Ok(x * 2.0))?;
        assert_eq!(out.get_arrayd("state")?.0, vec![1.0; 4]);
        assert_eq!(out.get_arrayd("nextstate")?, (vec![2.0, 4.0], vec![2]));

        let bad = Record::from_slice(&[("state", RecordValue::Integer(1))]);
        assert!(map_states(bad, Ok).is_err());
        Ok(())
    }
}
