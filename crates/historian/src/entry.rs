use models::{EvalState, StateTransition};
use std::collections::BTreeMap;

/// Version of the entry schema written to the store. Bump when the shape of
/// LogEntry changes; readers dispatch on it.
pub const SCHEMA_VERSION: u32 = 1;

/// The payload recorded for one state transition.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub schema_version: u32,
    pub previous: String,
    pub current: String,
    pub values: ValuesBlob,
}

/// Exactly one of these shapes is recorded per entry, chosen from the
/// transition's current outcome.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ValuesBlob {
    Error {
        error: Option<String>,
    },
    NoData {
        #[serde(rename = "noData")]
        no_data: bool,
    },
    Sampled {
        values: BTreeMap<String, f64>,
    },
}

impl LogEntry {
    pub fn new(transition: &StateTransition) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            previous: transition.previous_formatted(),
            current: transition.formatted(),
            values: values_blob(transition),
        }
    }
}

/// Serialize the entry for `transition` into a single log line.
pub fn encode(transition: &StateTransition) -> serde_json::Result<String> {
    serde_json::to_string(&LogEntry::new(transition))
}

fn values_blob(transition: &StateTransition) -> ValuesBlob {
    match transition.state {
        // An Error outcome with no attached message still records the error
        // shape; the payload is null, not an absent key.
        EvalState::Error => ValuesBlob::Error {
            error: transition.error.clone(),
        },
        // NoData wins over any sampled values present on the transition.
        EvalState::NoData => ValuesBlob::NoData { no_data: true },
        _ => ValuesBlob::Sampled {
            values: transition.values.clone(),
        },
    }
}
