//! Error handling for the ITSM board crate.

/// A specialized `Result` type for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// The main error type for dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Layered configuration extraction failed
    #[error("Configuration loading failed: {0}")]
    Figment(Box<figment::Error>),

    /// A data source failed to connect or fetch
    #[error("Data source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// HTTP transport error from the ITSM API client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A display backend failed
    #[error("Display error: {0}")]
    Display(String),

    /// Web display server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// No screen or source registered under the requested name
    #[error("Unknown {kind}: {name}")]
    UnknownPlugin { kind: &'static str, name: String },

    /// The rotation has nothing to show
    #[error("No screens configured; the rotation cannot start")]
    NoScreens,
}

impl From<figment::Error> for DashboardError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl DashboardError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new data source error
    pub fn source_error(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: msg.into(),
        }
    }

    /// Create a new display error
    pub fn display_error(msg: impl Into<String>) -> Self {
        Self::Display(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create an unknown screen error
    pub fn unknown_screen(name: impl Into<String>) -> Self {
        Self::UnknownPlugin {
            kind: "screen",
            name: name.into(),
        }
    }

    /// Create an unknown data source error
    pub fn unknown_source(name: impl Into<String>) -> Self {
        Self::UnknownPlugin {
            kind: "data source",
            name: name.into(),
        }
    }
}
