//! Input contracts for the workplace.
//!
//! Lifecycle commands map onto the clock state machine; element commands
//! inject instants or seek. Hosts may batch them as [`Inputs`] and apply them
//! before the next update.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationCommand {
    Start,
    Pause,
    Unpause,
    Stop,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCommand {
    Begin { element: String, offset_ms: i64 },
    End { element: String, offset_ms: i64 },
    AccessKey { key: char },
    Event { target: String, name: String },
    Navigate { element: String },
    Seek { time_ms: i64 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inputs {
    /// Clock commands applied before element commands.
    #[serde(default)]
    pub commands: Vec<AnimationCommand>,
    #[serde(default)]
    pub element_commands: Vec<ElementCommand>,
}
