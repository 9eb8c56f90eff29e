//! Storage of an episode in a directory.
//!
//! ```text
//! 00000000/
//! ├── episode.yaml   length and the kind, dtype and shape of every field
//! ├── state.bin      bincode-encoded column, time-major: [length, ...shape]
//! ├── action.bin
//! ├── ...
//! └── info.yaml      one mapping per step
//! ```
//!
//! Float fields are stored as `f32` arrays, integer and boolean fields as
//! vectors. String and nested fields, e.g., `info`, are stored as YAML
//! sequences.
use anyhow::{bail, Context, Result};
use itertools::Itertools;
use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use thesis_data_core::{
    error::ThesisDataError,
    record::{Record, RecordValue},
};

/// Name of the index file of an episode directory.
pub const INDEX_FILE: &str = "episode.yaml";

/// Kind of a stored field, following [`RecordValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// [`RecordValue::Scalar`].
    Scalar,

    /// [`RecordValue::Integer`].
    Integer,

    /// [`RecordValue::Bool`].
    Bool,

    /// [`RecordValue::Array1`].
    Array1,

    /// [`RecordValue::ArrayD`].
    ArrayD,

    /// [`RecordValue::String`] and [`RecordValue::Nested`].
    Yaml,
}

impl FieldKind {
    fn of(value: &RecordValue) -> Self {
        match value {
            RecordValue::Scalar(_) => Self::Scalar,
            RecordValue::Integer(_) => Self::Integer,
            RecordValue::Bool(_) => Self::Bool,
            RecordValue::Array1(_) => Self::Array1,
            RecordValue::ArrayD(..) => Self::ArrayD,
            RecordValue::String(_) | RecordValue::Nested(_) => Self::Yaml,
        }
    }

    /// Element type of the stored column.
    pub fn dtype(&self) -> &'static str {
        match self {
            Self::Scalar | Self::Array1 | Self::ArrayD => "float32",
            Self::Integer => "int64",
            Self::Bool => "bool",
            Self::Yaml => "yaml",
        }
    }

    /// Name of the file storing the column of a field.
    pub fn file_name(&self, field: &str) -> String {
        match self {
            Self::Yaml => format!("{}.yaml", field),
            _ => format!("{}.bin", field),
        }
    }
}

/// Description of a stored field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Name of the field, e.g., `state`.
    pub name: String,

    /// Kind of the values.
    pub kind: FieldKind,

    /// Element type, see [`FieldKind::dtype`].
    pub dtype: String,

    /// Shape of the value of a single step.
    pub shape: Vec<usize>,
}

/// Contents of `episode.yaml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeIndex {
    /// The number of steps.
    pub length: usize,

    /// Fields, in the order of the recording mode.
    pub fields: Vec<FieldInfo>,
}

/// Values of a field over all steps of an episode.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Float values, the first axis is time.
    Float32(ArrayD<f32>),

    /// Integer values.
    Int64(Vec<i64>),

    /// Flags.
    Bool(Vec<bool>),

    /// Strings and nested records.
    Yaml(Vec<Value>),
}

impl Column {
    /// The number of steps in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(x) => x.len_of(Axis(0)),
            Self::Int64(x) => x.len(),
            Self::Bool(x) => x.len(),
            Self::Yaml(x) => x.len(),
        }
    }

    /// Returns `true` if the column has no steps.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn inconsistent(field: &str, reason: String) -> anyhow::Error {
    ThesisDataError::InconsistentField {
        field: field.to_string(),
        reason,
    }
    .into()
}

fn step_value<'a>(record: &'a Record, field: &str, t: usize) -> Result<&'a RecordValue> {
    record
        .get(field)
        .ok_or_else(|| inconsistent(field, format!("missing at step {}", t)))
}

fn value_shape(value: &RecordValue) -> Vec<usize> {
    match value {
        RecordValue::Array1(v) => vec![v.len()],
        RecordValue::ArrayD(_, shape) => shape.clone(),
        _ => vec![],
    }
}

/// Fields of `order` found in `first`, followed by the other fields of `first` sorted by name.
fn field_order(first: &Record, order: &[String]) -> Vec<String> {
    let mut fields = order
        .iter()
        .filter(|k| first.get(k).is_some())
        .cloned()
        .collect::<Vec<_>>();
    fields.extend(first.keys().filter(|k| !order.contains(*k)).sorted().cloned());
    fields
}

fn build_column(info: &FieldInfo, records: &[Record]) -> Result<Column> {
    let name = info.name.as_str();
    let mismatch = |t: usize, v: &RecordValue| {
        inconsistent(
            name,
            format!(
                "step {} has {}{:?}, expected {}{:?}",
                t,
                v.type_name(),
                value_shape(v),
                info.dtype,
                info.shape
            ),
        )
    };

    let column = match info.kind {
        FieldKind::Scalar | FieldKind::Array1 | FieldKind::ArrayD => {
            let size = info.shape.iter().product::<usize>();
            let mut data = Vec::with_capacity(records.len() * size);
            for (t, record) in records.iter().enumerate() {
                match (step_value(record, name, t)?, info.kind) {
                    (RecordValue::Scalar(v), FieldKind::Scalar) => data.push(*v),
                    (RecordValue::Array1(v), FieldKind::Array1) if v.len() == size => {
                        data.extend_from_slice(v)
                    }
                    (RecordValue::ArrayD(v, shape), FieldKind::ArrayD) if *shape == info.shape => {
                        data.extend_from_slice(v)
                    }
                    (v, _) => return Err(mismatch(t, v)),
                }
            }
            let mut shape = vec![records.len()];
            shape.extend(info.shape.iter());
            Column::Float32(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
        }
        FieldKind::Integer => Column::Int64(
            records
                .iter()
                .enumerate()
                .map(|(t, r)| match step_value(r, name, t)? {
                    RecordValue::Integer(v) => Ok(*v),
                    v => Err(mismatch(t, v)),
                })
                .collect::<Result<_>>()?,
        ),
        FieldKind::Bool => Column::Bool(
            records
                .iter()
                .enumerate()
                .map(|(t, r)| match step_value(r, name, t)? {
                    RecordValue::Bool(v) => Ok(*v),
                    v => Err(mismatch(t, v)),
                })
                .collect::<Result<_>>()?,
        ),
        FieldKind::Yaml => Column::Yaml(
            records
                .iter()
                .enumerate()
                .map(|(t, r)| match step_value(r, name, t)? {
                    v @ (RecordValue::String(_) | RecordValue::Nested(_)) => Ok(v.to_yaml()),
                    v => Err(mismatch(t, v)),
                })
                .collect::<Result<_>>()?,
        ),
    };
    Ok(column)
}

/// Converts a YAML value read from a column back into a record value.
///
/// Flat sequences of numbers become [`RecordValue::Array1`]. Other values
/// that have no counterpart are kept as their YAML text.
pub fn record_value_from_yaml(value: &Value) -> RecordValue {
    match value {
        Value::Bool(b) => RecordValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RecordValue::Integer(i),
            None => RecordValue::Scalar(n.as_f64().unwrap_or(f64::NAN) as f32),
        },
        Value::String(s) => RecordValue::String(s.clone()),
        Value::Mapping(m) => {
            let mut record = Record::empty();
            for (k, v) in m.iter() {
                let key = match k {
                    Value::String(s) => s.clone(),
                    k => yaml_text(k),
                };
                record.insert(key, record_value_from_yaml(v));
            }
            RecordValue::Nested(record)
        }
        Value::Sequence(s) if s.iter().all(Value::is_number) => RecordValue::Array1(
            s.iter()
                .filter_map(Value::as_f64)
                .map(|v| v as f32)
                .collect(),
        ),
        v => RecordValue::String(yaml_text(v)),
    }
}

fn yaml_text(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_start_matches("---").trim().to_string())
        .unwrap_or_default()
}

/// An episode held in memory, column by column.
#[derive(Clone, Debug, PartialEq)]
pub struct Episode {
    index: EpisodeIndex,
    columns: Vec<Column>,
}

impl Episode {
    /// Collects the step records of an episode into columns.
    ///
    /// Fields listed in `order` come first, in that order, followed by the
    /// remaining fields sorted by name. The kind and shape of each field are
    /// taken from the first record; every record must agree with them.
    pub fn from_records(records: &[Record], order: &[String]) -> Result<Self> {
        let first = match records.first() {
            Some(first) => first,
            None => {
                return Ok(Self {
                    index: EpisodeIndex::default(),
                    columns: vec![],
                })
            }
        };

        let fields = field_order(first, order)
            .into_iter()
            .map(|name| {
                let value = step_value(first, &name, 0)?;
                let kind = FieldKind::of(value);
                Ok(FieldInfo {
                    dtype: kind.dtype().to_string(),
                    shape: value_shape(value),
                    kind,
                    name,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for (t, record) in records.iter().enumerate() {
            if let Some(k) = record.keys().find(|k| fields.iter().all(|f| &f.name != *k)) {
                return Err(inconsistent(k, format!("unexpected at step {}", t)));
            }
        }

        let columns = fields
            .iter()
            .map(|info| build_column(info, records))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            index: EpisodeIndex {
                length: records.len(),
                fields,
            },
            columns,
        })
    }

    /// Writes the episode into a directory, creating it if needed.
    ///
    /// The index is written last, so a directory without `episode.yaml` is
    /// an incomplete episode.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        for (info, column) in self.index.fields.iter().zip(self.columns.iter()) {
            let path = dir.join(info.kind.file_name(&info.name));
            let mut file = BufWriter::new(File::create(&path)?);
            match column {
                Column::Float32(x) => bincode::serialize_into(&mut file, x)?,
                Column::Int64(x) => bincode::serialize_into(&mut file, x)?,
                Column::Bool(x) => bincode::serialize_into(&mut file, x)?,
                Column::Yaml(x) => serde_yaml::to_writer(&mut file, x)?,
            }
            file.flush()?;
        }

        let mut file = File::create(dir.join(INDEX_FILE))?;
        file.write_all(serde_yaml::to_string(&self.index)?.as_bytes())?;
        Ok(())
    }

    /// Reads an episode written by [`Episode::save`].
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let index_path = dir.join(INDEX_FILE);
        let file = File::open(&index_path)
            .with_context(|| format!("Couldn't open episode index {:?}", index_path))?;
        let index: EpisodeIndex = serde_yaml::from_reader(BufReader::new(file))?;

        let columns = index
            .fields
            .iter()
            .map(|info| load_column(dir, info, index.length))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { index, columns })
    }

    /// Index of the episode.
    pub fn index(&self) -> &EpisodeIndex {
        &self.index
    }

    /// The number of steps.
    pub fn len(&self) -> usize {
        self.index.length
    }

    /// Returns `true` if the episode has no steps.
    pub fn is_empty(&self) -> bool {
        self.index.length == 0
    }

    /// Fields of the episode.
    pub fn fields(&self) -> &[FieldInfo] {
        &self.index.fields
    }

    /// Column of a field.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index
            .fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.columns[i])
    }

    /// Step record at time `t`.
    pub fn record(&self, t: usize) -> Result<Record> {
        if t >= self.len() {
            bail!("Step {} out of range, episode has {} steps", t, self.len());
        }

        let mut record = Record::empty();
        for (info, column) in self.index.fields.iter().zip(self.columns.iter()) {
            let value = match column {
                Column::Float32(x) => {
                    let row = x.index_axis(Axis(0), t);
                    match info.kind {
                        FieldKind::Scalar => {
                            RecordValue::Scalar(row.iter().copied().next().unwrap_or(0.0))
                        }
                        FieldKind::Array1 => RecordValue::Array1(row.iter().copied().collect()),
                        _ => RecordValue::ArrayD(row.iter().copied().collect(), row.shape().to_vec()),
                    }
                }
                Column::Int64(x) => RecordValue::Integer(x[t]),
                Column::Bool(x) => RecordValue::Bool(x[t]),
                Column::Yaml(x) => record_value_from_yaml(&x[t]),
            };
            record.insert(info.name.clone(), value);
        }
        Ok(record)
    }

    /// All step records.
    pub fn records(&self) -> Result<Vec<Record>> {
        (0..self.len()).map(|t| self.record(t)).collect()
    }
}

fn load_column(dir: &Path, info: &FieldInfo, length: usize) -> Result<Column> {
    let path = dir.join(info.kind.file_name(&info.name));
    let file = File::open(&path).with_context(|| format!("Couldn't open column {:?}", path))?;
    let rdr = BufReader::new(file);

    let column = match info.kind {
        FieldKind::Scalar | FieldKind::Array1 | FieldKind::ArrayD => {
            let x: ArrayD<f32> = bincode::deserialize_from(rdr)?;
            let mut shape = vec![length];
            shape.extend(info.shape.iter());
            if x.shape() != shape.as_slice() {
                return Err(inconsistent(
                    &info.name,
                    format!("stored shape {:?}, expected {:?}", x.shape(), shape),
                ));
            }
            Column::Float32(x)
        }
        FieldKind::Integer => Column::Int64(bincode::deserialize_from(rdr)?),
        FieldKind::Bool => Column::Bool(bincode::deserialize_from(rdr)?),
        FieldKind::Yaml => Column::Yaml(serde_yaml::from_reader(rdr)?),
    };

    if column.len() != length {
        return Err(inconsistent(
            &info.name,
            format!("{} steps stored, expected {}", column.len(), length),
        ));
    }
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn step(t: usize) -> Record {
        let mut info = Record::empty();
        info.insert("label", RecordValue::Integer(t as i64 % 3));
        info.insert("name", RecordValue::String(format!("step-{}", t)));
        Record::from_slice(&[
            ("state", RecordValue::ArrayD(vec![t as f32; 6], vec![1, 2, 3])),
            ("action", RecordValue::Integer(t as i64)),
            ("reward", RecordValue::Scalar(0.5 * t as f32)),
            ("done", RecordValue::Bool(t == 2)),
            ("info", RecordValue::Nested(info)),
            ("anomaly", RecordValue::Bool(false)),
        ])
    }

    fn order() -> Vec<String> {
        ["state", "action", "reward", "done", "info"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new("episode")?;
        let records = (0..3).map(step).collect::<Vec<_>>();

        let episode = Episode::from_records(&records, &order())?;
        let names = episode.fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["state", "action", "reward", "done", "info", "anomaly"]);
        assert_eq!(episode.fields()[0].shape, vec![1, 2, 3]);
        assert_eq!(episode.fields()[1].dtype, "int64");

        let path = dir.path().join("00000000");
        episode.save(&path)?;
        for file in ["episode.yaml", "state.bin", "action.bin", "done.bin", "info.yaml"] {
            assert!(path.join(file).is_file(), "{} is missing", file);
        }

        let loaded = Episode::load(&path)?;
        assert_eq!(loaded, episode);
        assert_eq!(loaded.records()?, records);

        match loaded.column("state") {
            Some(Column::Float32(x)) => assert_eq!(x.shape(), &[3, 1, 2, 3]),
            c => panic!("unexpected column {:?}", c),
        }
        Ok(())
    }

    #[test]
    fn test_inconsistent_records() {
        let mut records = (0..2).map(step).collect::<Vec<_>>();
        records[1].insert("state", RecordValue::ArrayD(vec![0.0; 4], vec![2, 2]));
        let err = Episode::from_records(&records, &order()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ThesisDataError>(),
            Some(ThesisDataError::InconsistentField { field, .. }) if field == "state"
        ));

        let mut records = (0..2).map(step).collect::<Vec<_>>();
        records[1].remove("reward");
        assert!(Episode::from_records(&records, &order()).is_err());
    }

    #[test]
    fn test_empty_episode() -> Result<()> {
        let dir = TempDir::new("episode")?;
        let episode = Episode::from_records(&[], &order())?;
        episode.save(dir.path())?;
        let loaded = Episode::load(dir.path())?;
        assert!(loaded.is_empty());
        assert!(loaded.fields().is_empty());
        Ok(())
    }

    #[test]
    fn test_incomplete_directory() -> Result<()> {
        let dir = TempDir::new("episode")?;
        assert!(Episode::load(dir.path()).is_err());
        Ok(())
    }
}
