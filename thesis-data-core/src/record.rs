//! Types and traits for step records.
//!
//! A [`Record`] is a flexible container of key-value pairs. The episode iterator
//! emits one record per environment step, holding the fields selected by the
//! recording [`Mode`](crate::Mode), and a [`Recorder`] collects them.
//!
//! # Basic Usage
//!
//! ```rust
//! use thesis_data_core::record::{Record, RecordValue};
//!
//! // following values are obtained with some process in reality
//! let obs = vec![1f32, 2.0, 3.0, 4.0, 5.0];
//! let reward = -1f32;
//!
//! let mut record = Record::empty();
//! record.insert("state", RecordValue::Array1(obs));
//! record.insert("action", RecordValue::Integer(1));
//! record.insert("reward", RecordValue::Scalar(reward));
//! record.insert("done", RecordValue::Bool(false));
//! ```
//!
//! # Data Types
//!
//! The module supports various data types through [`RecordValue`]:
//!
//! * `Scalar(f32)` - Single floating-point values
//! * `Integer(i64)` - Integer values, e.g., discrete actions
//! * `Bool(bool)` - Flags
//! * `Array1(Vec<f32>)` - 1-dimensional arrays
//! * `ArrayD(Vec<f32>, Vec<usize>)` - n-dimensional arrays with shape
//! * `String(String)` - Text values
//! * `Nested(Record)` - Records, e.g., the information dictionary of a step
mod base;
mod buffered_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use recorder::Recorder;
