use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::dataset::SeatNo;

/// Last pipeline stage reached by the run that wrote the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    #[default]
    Start,
    /// Free-form label of the stage in progress, e.g. `certificate_generation`.
    InProgress(String),
}

impl Stage {
    pub const START_LABEL: &'static str = "start";

    pub fn in_progress(label: impl Into<String>) -> Self {
        Stage::InProgress(label.into())
    }

    pub fn label(&self) -> &str {
        match self {
            Stage::Start => Self::START_LABEL,
            Stage::InProgress(label) => label,
        }
    }
}

impl From<String> for Stage {
    fn from(label: String) -> Self {
        if label == Self::START_LABEL {
            Stage::Start
        } else {
            Stage::InProgress(label)
        }
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.label().to_string()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted checkpoint document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckpointState {
    #[serde(
        rename = "processed_seat_numbers",
        deserialize_with = "deserialize_seats",
        default
    )]
    pub processed: BTreeSet<SeatNo>,
    #[serde(rename = "step", default)]
    pub stage: Stage,
}

impl CheckpointState {
    pub fn is_processed(&self, seat: &SeatNo) -> bool {
        self.processed.contains(seat)
    }

    pub fn is_zero(&self) -> bool {
        self.processed.is_empty() && self.stage == Stage::Start
    }
}

/// Older checkpoint files stored seat numbers as JSON numbers.
fn deserialize_seats<'de, D>(deserializer: D) -> Result<BTreeSet<SeatNo>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSeat {
        Number(i64),
        Text(String),
    }

    let raw: Vec<RawSeat> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|seat| match seat {
            RawSeat::Number(n) => SeatNo(n.to_string()),
            RawSeat::Text(s) => SeatNo(s),
        })
        .collect())
}

/// How often the assembler writes progress into the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointPolicy {
    /// Only filter out seats recorded by earlier runs.
    #[default]
    Coarse,
    /// Additionally record every seat as soon as it is laid out.
    PerRecord,
}

impl FromStr for CheckpointPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "coarse" => Ok(CheckpointPolicy::Coarse),
            "per-record" | "per_record" | "fine" => Ok(CheckpointPolicy::PerRecord),
            other => Err(format!(
                "unknown checkpoint policy '{other}', expected 'coarse' or 'per-record'"
            )),
        }
    }
}
