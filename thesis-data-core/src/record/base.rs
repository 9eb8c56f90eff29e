//! Base implementation of records.
//!
//! This module provides a flexible record system for storing and retrieving
//! various types of data, including scalars, arrays, strings and nested records.
use crate::error::ThesisDataError;
use serde_yaml::{Mapping, Value};
use std::{
    collections::{
        hash_map::{IntoIter, Iter, Keys},
        BTreeMap, HashMap,
    },
    convert::Into,
};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, e.g., a reward.
    Scalar(f32),

    /// An integer value, e.g., a discrete action.
    Integer(i64),

    /// A flag, e.g., the end of an episode.
    Bool(bool),

    /// A 1-dimensional array of floating-point values.
    Array1(Vec<f32>),

    /// An n-dimensional array in row-major order with shape information.
    ArrayD(Vec<f32>, Vec<usize>),

    /// A text value, useful for storing labels or descriptions.
    String(String),

    /// A nested record.
    Nested(Record),
}

impl RecordValue {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "Scalar",
            Self::Integer(_) => "Integer",
            Self::Bool(_) => "Bool",
            Self::Array1(_) => "Array1",
            Self::ArrayD(..) => "ArrayD",
            Self::String(_) => "String",
            Self::Nested(_) => "Nested",
        }
    }

    /// Converts the value into YAML.
    ///
    /// n-dimensional arrays are written as nested sequences.
    pub fn to_yaml(&self) -> Value {
        fn nested(data: &[f32], shape: &[usize]) -> Value {
            match shape.split_first() {
                None => data.first().map_or(Value::Null, |v| Value::from(*v as f64)),
                Some((_, [])) => Value::Sequence(data.iter().map(|v| Value::from(*v as f64)).collect()),
                Some((n, rest)) => {
                    let stride = rest.iter().product::<usize>();
                    Value::Sequence(
                        (0..*n)
                            .map(|i| nested(&data[i * stride..(i + 1) * stride], rest))
                            .collect(),
                    )
                }
            }
        }

        match self {
            Self::Scalar(v) => Value::from(*v as f64),
            Self::Integer(v) => Value::from(*v),
            Self::Bool(v) => Value::Bool(*v),
            Self::Array1(v) => Value::Sequence(v.iter().map(|x| Value::from(*x as f64)).collect()),
            Self::ArrayD(v, shape) => nested(v, shape),
            Self::String(s) => Value::String(s.clone()),
            Self::Nested(r) => r.to_yaml(),
        }
    }
}

/// A container for storing key-value pairs of various data types.
///
/// # Examples
///
/// ```rust
/// use thesis_data_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("reward", 0.5);
/// record.insert("done", RecordValue::Bool(true));
///
/// assert_eq!(record.get_scalar("reward").unwrap(), 0.5);
/// assert!(record.get_bool("done").unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Removes a key from the record, returning its value.
    pub fn remove(&mut self, k: &str) -> Option<RecordValue> {
        self.0.remove(k)
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns an iterator that consumes the record.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records, consuming both.
    ///
    /// If both records contain the same key, the value from the second record
    /// will overwrite the value from the first record.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges another record into this one in place.
    pub fn merge_inplace(&mut self, record: Record) {
        for (k, v) in record.0.into_iter() {
            self.0.insert(k, v);
        }
    }

    fn get_value(&self, k: &str) -> Result<&RecordValue, ThesisDataError> {
        self.0
            .get(k)
            .ok_or_else(|| ThesisDataError::RecordKeyError(k.to_string()))
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key does not exist
    /// - The value is not a scalar
    pub fn get_scalar(&self, k: &str) -> Result<f32, ThesisDataError> {
        match self.get_value(k)? {
            RecordValue::Scalar(v) => Ok(*v),
            _ => Err(ThesisDataError::RecordValueTypeError("Scalar".to_string())),
        }
    }

    /// Gets an integer value from the record.
    pub fn get_integer(&self, k: &str) -> Result<i64, ThesisDataError> {
        match self.get_value(k)? {
            RecordValue::Integer(v) => Ok(*v),
            _ => Err(ThesisDataError::RecordValueTypeError("Integer".to_string())),
        }
    }

    /// Gets a flag from the record.
    pub fn get_bool(&self, k: &str) -> Result<bool, ThesisDataError> {
        match self.get_value(k)? {
            RecordValue::Bool(v) => Ok(*v),
            _ => Err(ThesisDataError::RecordValueTypeError("Bool".to_string())),
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, ThesisDataError> {
        match self.get_value(k)? {
            RecordValue::Array1(v) => Ok(v.clone()),
            _ => Err(ThesisDataError::RecordValueTypeError("Array1".to_string())),
        }
    }

    /// Gets an n-dimensional array from the record.
    ///
    /// # Returns
    ///
    /// A tuple containing the array data and its shape
    pub fn get_arrayd(&self, k: &str) -> Result<(Vec<f32>, Vec<usize>), ThesisDataError> {
        match self.get_value(k)? {
            RecordValue::ArrayD(v, s) => Ok((v.clone(), s.clone())),
            _ => Err(ThesisDataError::RecordValueTypeError("ArrayD".to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, ThesisDataError> {
        match self.get_value(k)? {
            RecordValue::String(s) => Ok(s.clone()),
            _ => Err(ThesisDataError::RecordValueTypeError("String".to_string())),
        }
    }

    /// Gets a nested record from the record.
    pub fn get_nested(&self, k: &str) -> Result<&Record, ThesisDataError> {
        match self.get_value(k)? {
            RecordValue::Nested(r) => Ok(r),
            _ => Err(ThesisDataError::RecordValueTypeError("Nested".to_string())),
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of key-value pairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Converts the record into a YAML mapping with sorted keys.
    pub fn to_yaml(&self) -> Value {
        let sorted: BTreeMap<_, _> = self.0.iter().collect();
        let mut mapping = Mapping::new();
        for (k, v) in sorted {
            mapping.insert(Value::String(k.clone()), v.to_yaml());
        }
        Value::Mapping(mapping)
    }
}
