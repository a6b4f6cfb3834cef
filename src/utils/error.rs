use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransposeError {
    #[error("Container format error: {message}")]
    ContainerFormat { message: String },

    #[error("Document parse error: {message}")]
    DocumentParse { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Container,
    Document,
    Io,
    Config,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TransposeError {
    pub fn container(message: impl Into<String>) -> Self {
        Self::ContainerFormat {
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::DocumentParse {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ContainerFormat { .. } => ErrorCategory::Container,
            Self::DocumentParse { .. } => ErrorCategory::Document,
            Self::Io(_) => ErrorCategory::Io,
            Self::Serialization(_) => ErrorCategory::Output,
            Self::Config { .. } | Self::MissingConfig { .. } | Self::InvalidConfigValue { .. } => {
                ErrorCategory::Config
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::Container | ErrorCategory::Document | ErrorCategory::Config => {
                ErrorSeverity::High
            }
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// Process exit code; every category gets its own.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Config => 2,
            ErrorCategory::Container => 3,
            ErrorCategory::Document => 4,
            ErrorCategory::Io => 5,
            ErrorCategory::Output => 6,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ContainerFormat { message } => {
                format!("The score archive could not be used: {}", message)
            }
            Self::DocumentParse { message } => {
                format!("The score document is not well-formed XML: {}", message)
            }
            Self::Io(e) => format!("Reading or writing a file failed: {}", e),
            Self::Serialization(e) => format!("Could not write the report: {}", e),
            Self::Config { message } => format!("Invalid configuration: {}", message),
            Self::MissingConfig { field } => format!("Missing required setting '{}'", field),
            Self::InvalidConfigValue {
                field,
                value,
                reason,
            } => format!("Setting '{}' has invalid value '{}': {}", field, value, reason),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Container => {
                "Check that the input is a compressed MusicXML (.mxl) file containing a score document"
            }
            ErrorCategory::Document => {
                "Re-export the score from the notation program or the OMR tool and try again"
            }
            ErrorCategory::Io => "Check that the paths exist and that you have read/write permission",
            ErrorCategory::Config => "Fix the command line arguments or the configuration file",
            ErrorCategory::Output => "Retry without --json or report the problem",
        }
    }
}

impl From<zip::result::ZipError> for TransposeError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::container(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransposeError>;
