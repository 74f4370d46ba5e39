use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// The source lacks columns the loader cannot do without. Raised before
    /// any record is read, so nothing downstream has run.
    #[error("{source_name} is missing required column(s): {}", .missing.join(", "))]
    Schema {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write export {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("{path} line {line}: invalid {field} \"{value}\"")]
    InvalidValue {
        path: String,
        line: usize,
        field: &'static str,
        value: String,
    },
}

impl ReconError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ReconError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &str, source: csv::Error) -> Self {
        ReconError::Csv {
            path: path.to_string(),
            source,
        }
    }
}
