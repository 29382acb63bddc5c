use std::time::Duration;
use thiserror::Error;

/// Boxed cause carried by the fatal, wrapping variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while driving a browser session and generating page objects
#[derive(Debug, Error)]
pub enum PomError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The handle outlived the DOM node it pointed at
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Timed out after {timeout:?} waiting for {condition}")]
    Timeout { condition: String, timeout: Duration },

    #[error("Script evaluation failed: {0}")]
    ScriptFailed(String),

    #[error("Failed to switch frame: {0}")]
    FrameSwitchFailed(String),

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(String),

    #[error("Failed to parse page {url}: {source}")]
    ParsingFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to generate page object ({context}): {source}")]
    GenerationFailed {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("This is not the {class_name} page: expected title containing '{expected}', current page is {url}")]
    PageMismatch {
        class_name: String,
        expected: String,
        url: String,
    },

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Field '{field}' does not support {operation}")]
    UnsupportedOperation { field: String, operation: String },

    #[error("Invalid cookie record on line {line}: {reason}")]
    CookieFormat { line: usize, reason: String },

    #[error("Browser rejected cookie '{name}': {reason}")]
    CookieRejected { name: String, reason: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PomError {
    /// Wrap any error as a fatal parsing failure for `url`
    pub fn parsing(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        PomError::ParsingFailed { url: url.into(), source: source.into() }
    }

    /// Wrap any error as a fatal generation failure
    pub fn generation(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        PomError::GenerationFailed { context: context.into(), source: source.into() }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, PomError::StaleElement(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PomError::Timeout { .. })
    }

    /// Errors a collection strategy recovers from by skipping the element
    pub fn is_element_local(&self) -> bool {
        matches!(self, PomError::StaleElement(_) | PomError::ElementNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, PomError>;
