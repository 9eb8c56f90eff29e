//! Recording modes.
//!
//! A mode selects the fields of a step that are persisted. It is written as a
//! string of field letters, e.g., `sard` for state, action, reward and done.
//! The second `s` in a mode denotes the next state, as in `sards`.
use crate::{error::ThesisDataError, record::Record};
use std::{fmt, str::FromStr};

/// A field of a step record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// Observation before the action.
    State,

    /// Action.
    Action,

    /// Reward.
    Reward,

    /// Observation after the action.
    NextState,

    /// End of the episode.
    Done,

    /// Additional information of the environment.
    Info,
}

impl Field {
    /// Key of the field in a step record.
    pub fn key(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Action => "action",
            Self::Reward => "reward",
            Self::NextState => "nextstate",
            Self::Done => "done",
            Self::Info => "info",
        }
    }

    /// All fields, in the order of a full record.
    pub fn all() -> [Field; 6] {
        [
            Self::State,
            Self::Action,
            Self::Reward,
            Self::NextState,
            Self::Done,
            Self::Info,
        ]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A named schema selecting the fields of step records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mode {
    name: String,
    fields: Vec<Field>,
}

impl Mode {
    /// Parses a mode string such as `sard`.
    pub fn new(name: impl Into<String>) -> Result<Self, ThesisDataError> {
        let name = name.into();
        let invalid = |reason: String| ThesisDataError::InvalidMode {
            mode: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("no fields".to_string()));
        }

        let mut fields = Vec::with_capacity(name.len());
        for c in name.chars() {
            let field = match c {
                's' if fields.contains(&Field::State) => Field::NextState,
                's' => Field::State,
                'a' => Field::Action,
                'r' => Field::Reward,
                'd' => Field::Done,
                'i' => Field::Info,
                c => return Err(invalid(format!("unknown field {:?}", c))),
            };
            if fields.contains(&field) {
                return Err(invalid(format!("repeated field {}", field)));
            }
            fields.push(field);
        }

        Ok(Self { name, fields })
    }

    /// Name of the mode, i.e., the mode string.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields of the mode, in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns `true` if the mode records the field.
    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Keeps the fields of the mode in a full step record.
    ///
    /// Fields missing in the full record are skipped.
    pub fn select(&self, mut full: Record) -> Record {
        let mut record = Record::empty();
        for field in self.fields.iter() {
            if let Some(v) = full.remove(field.key()) {
                record.insert(field.key(), v);
            }
        }
        record
    }
}

impl FromStr for Mode {
    type Err = ThesisDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
