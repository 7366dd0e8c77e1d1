//! Error taxonomy for the pipeline.
//!
//! Every failure the pipeline can surface is one of these kinds, and each
//! kind has a fixed recovery policy rather than leaving it to scattered
//! call sites:
//!
//! | Kind           | Policy                                               |
//! |----------------|------------------------------------------------------|
//! | [`Config`]     | propagate                                            |
//! | [`NotFound`]   | propagate                                            |
//! | [`Format`]     | propagate                                            |
//! | [`Parse`]      | propagate                                            |
//! | [`EmptyContent`] | propagate                                          |
//! | [`Backend`]    | recovered at ingest (empty sentinel) and post        |
//! |                | (status record); propagated everywhere else          |
//! | [`Io`]         | recovered with a warning where persistence is        |
//! |                | non-critical                                         |
//! | [`Pipeline`]   | propagate, naming the failed stage                   |
//!
//! [`Config`]: Error::Config
//! [`NotFound`]: Error::NotFound
//! [`Format`]: Error::Format
//! [`Parse`]: Error::Parse
//! [`EmptyContent`]: Error::EmptyContent
//! [`Backend`]: Error::Backend
//! [`Io`]: Error::Io
//! [`Pipeline`]: Error::Pipeline

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pipeline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A required environment value is missing.
    #[error("missing required environment variable: {0}")]
    Config(&'static str),

    /// No cache entry is present where one was expected.
    #[error("{0}")]
    NotFound(String),

    /// Cache content has the wrong shape.
    #[error("unexpected cache format: {0}")]
    Format(String),

    /// Generation output is not valid JSON after cleanup.
    #[error("failed to parse generation response: {0}")]
    Parse(String),

    /// The ingest stage produced nothing for downstream stages to use.
    #[error("no content available to create a post")]
    EmptyContent,

    /// An external scrape, agent, or LLM call failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// Cache or file persistence failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline stage failed; carries the stage name and the cause.
    #[error("pipeline stage '{stage}' failed: {source}")]
    Pipeline {
        /// Name of the failing stage.
        stage: &'static str,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error with the name of the pipeline stage that raised it.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Error::Pipeline {
            stage,
            source: Box::new(self),
        }
    }

    /// Build a [`Error::Backend`] from any displayable cause.
    pub fn backend(cause: impl std::fmt::Display) -> Self {
        Error::Backend(cause.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Backend(e.to_string())
    }
}
