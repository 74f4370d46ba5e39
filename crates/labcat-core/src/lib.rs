pub mod app_config;
pub mod category;
pub mod columns;
pub mod config;
pub mod normalize;
pub mod records;

pub use app_config::{AppConfig, Environment};
pub use category::{classify, CategoryLabel, Classifier, FilterRule, Rule};
pub use columns::{column_map_for, find_column, load_column_map, AuthoritativeColumns, ColumnMap, CurrentColumns};
pub use config::{load_app_config, load_app_config_from_env};
pub use normalize::{normalize_identifier, normalize_text, product_code, product_prefix};
pub use records::{
    AuthoritativeRecord, CompositeKey, CurrentRecord, KeyDefect, VerificationStatus,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read column map {path}: {source}")]
    ColumnsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse column map: {0}")]
    ColumnsFileParse(#[from] serde_yaml::Error),

    #[error("column map validation failed: {0}")]
    Validation(String),
}
