use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,
    ValidationMultipleErrors,

    InstanceNotFound,
    InstanceSourceNotFound,

    BackendUnknown,
    ProxyUnknown,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",
            ErrorCode::ValidationMultipleErrors => "validation.multiple_errors",

            ErrorCode::InstanceNotFound => "instance.not_found",
            ErrorCode::InstanceSourceNotFound => "instance.source_not_found",

            ErrorCode::BackendUnknown => "backend.unknown",
            ErrorCode::ProxyUnknown => "proxy.unknown",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceNotFoundDetails {
    pub uuid: String,
    pub stage: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInstanceNotFoundDetails {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uuid: Option<String>,
    pub stage: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendUnknownDetails {
    pub backend_type: String,
    pub uuid: String,
    pub stage: String,
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyUnknownDetails {
    pub proxy_type: String,
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    /// Aggregates several validation problems into a single error.
    pub fn validation_multiple_errors(problems: Vec<String>) -> Self {
        let count = problems.len();
        Self::new(
            ErrorCode::ValidationMultipleErrors,
            format!("{} validation problem(s) found", count),
            serde_json::json!({ "problems": problems }),
        )
    }

    /// The acting instance does not resolve in the store.
    pub fn instance_not_found(uuid: impl Into<String>, stage: impl Into<String>) -> Self {
        let uuid = uuid.into();
        let stage = stage.into();
        let message = format!("Instance '{}' not found (stage: {})", uuid, stage);

        Self::new(
            ErrorCode::InstanceNotFound,
            message,
            to_details(InstanceNotFoundDetails { uuid, stage }),
        )
        .with_hint("Run 'stagecraft instance list' to see known instances")
    }

    /// A data source of `uuid` could not be resolved to a source directory.
    pub fn source_instance_not_found(
        uuid: impl Into<String>,
        source_uuid: Option<String>,
        stage: impl Into<String>,
    ) -> Self {
        let uuid = uuid.into();
        let stage = stage.into();
        let message = match &source_uuid {
            Some(source) => format!(
                "Source instance '{}' referenced by instance '{}' not found (stage: {})",
                source, uuid, stage
            ),
            None => format!(
                "Data source of instance '{}' has neither 'uuid' nor 'dataDir' (stage: {})",
                uuid, stage
            ),
        };

        Self::new(
            ErrorCode::InstanceSourceNotFound,
            message,
            to_details(SourceInstanceNotFoundDetails {
                uuid,
                source_uuid,
                stage,
            }),
        )
    }

    pub fn backend_unknown(
        backend_type: impl Into<String>,
        uuid: impl Into<String>,
        stage: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        let backend_type = backend_type.into();
        let uuid = uuid.into();
        let stage = stage.into();
        let message = format!(
            "No deployment backend registered for type '{}' (instance: {}, stage: {})",
            backend_type, uuid, stage
        );

        Self::new(
            ErrorCode::BackendUnknown,
            message,
            to_details(BackendUnknownDetails {
                backend_type,
                uuid,
                stage,
                available,
            }),
        )
    }

    pub fn proxy_unknown(proxy_type: impl Into<String>, available: Vec<String>) -> Self {
        let proxy_type = proxy_type.into();
        let message = format!("No proxy flavor registered for type '{}'", proxy_type);

        Self::new(
            ErrorCode::ProxyUnknown,
            message,
            to_details(ProxyUnknownDetails {
                proxy_type,
                available,
            }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
