use thiserror::Error;

use crate::types::{Orm, Verb};

#[derive(Debug, Error)]
pub enum OrmsError {
    #[error(
        "Usage: orm-helper <command> <orm>\nCommands: {commands}\nORMs: {targets}",
        commands = Verb::joined(),
        targets = Orm::joined_with_all()
    )]
    MissingArguments,

    #[error("Invalid ORM: {0}. Must be one of: {valid}", valid = Orm::joined_with_all())]
    InvalidTarget(String),

    #[error("Unknown command: {0}. Must be one of: {valid}", valid = Verb::joined())]
    UnknownCommand(String),

    #[error(
        "Command '{0}' does not support target 'all'; supported with 'all': {valid}",
        valid = Verb::fan_out_joined()
    )]
    UnsupportedFanOut(String),

    #[error("'{0}' not found on PATH")]
    ToolNotFound(String),

    #[error("working directory does not exist: {}", .0.display())]
    MissingDirectory(std::path::PathBuf),

    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}", status = exit_label(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl OrmsError {
    /// Errors detected before any external process is spawned.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OrmsError::MissingArguments
                | OrmsError::InvalidTarget(_)
                | OrmsError::UnknownCommand(_)
                | OrmsError::UnsupportedFanOut(_)
        )
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, OrmsError>;
