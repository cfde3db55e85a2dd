use std::fmt::{self, Display, Formatter};

use qfilter_parser::{ParseError, RepairError};
use serde::Serialize;
use thiserror::Error;

/// The hook in which a plugin failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    BeforeParse,
    AfterParse,
    BeforeQuery,
    AfterQuery,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::BeforeParse => "before_parse",
            Stage::AfterParse => "after_parse",
            Stage::BeforeQuery => "before_query",
            Stage::AfterQuery => "after_query",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    RepairFailed(#[from] RepairError),

    #[error("plugin `{plugin}` failed in {stage}: {message}")]
    Plugin {
        plugin: String,
        stage: Stage,
        message: String,
    },

    /// The adapter cannot render this query with the context it was given.
    #[error("{0}")]
    AdapterMismatch(String),
}

/// What a plugin hook returns when it refuses to continue. The manager wraps it into
/// [`Error::Plugin`] together with the plugin name and stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
