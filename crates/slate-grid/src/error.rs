use std::fmt;

#[derive(Debug)]
pub enum GridError {
    Store(String),
    Callback(String),
    Export(String),
    Serialization(String),
    Persistence(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Store(msg) => write!(f, "store error: {msg}"),
            GridError::Callback(msg) => write!(f, "callback error: {msg}"),
            GridError::Export(msg) => write!(f, "export error: {msg}"),
            GridError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            GridError::Persistence(msg) => write!(f, "persistence error: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}

impl GridError {
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            GridError::Serialization(_) => http::StatusCode::BAD_REQUEST,
            GridError::Store(_)
            | GridError::Callback(_)
            | GridError::Export(_)
            | GridError::Persistence(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        GridError::Serialization(e.to_string())
    }
}

impl From<bson::error::Error> for GridError {
    fn from(e: bson::error::Error) -> Self {
        GridError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for GridError {
    fn from(e: csv::Error) -> Self {
        GridError::Export(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for GridError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        GridError::Export(e.to_string())
    }
}

impl From<std::io::Error> for GridError {
    fn from(e: std::io::Error) -> Self {
        GridError::Export(e.to_string())
    }
}
