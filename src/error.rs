use ironframe_scanner::ScanError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("candidate scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("stylesheet compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid ignore pattern '{pattern}': {source}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Failure reported by a [`Compiler`](crate::generator::Compiler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage}: {message}")]
pub struct CompileError {
    pub stage: CompileStage,
    pub message: String,
}

impl CompileError {
    pub fn compile(message: impl Into<String>) -> Self {
        Self {
            stage: CompileStage::Compile,
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self {
            stage: CompileStage::Build,
            message: message.into(),
        }
    }

    pub fn optimize(message: impl Into<String>) -> Self {
        Self {
            stage: CompileStage::Optimize,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStage {
    Compile,
    Build,
    Optimize,
}

impl std::fmt::Display for CompileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compile => f.write_str("compile"),
            Self::Build => f.write_str("build"),
            Self::Optimize => f.write_str("optimize"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Raised by the synthetic context handed to foreign transform steps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("{0} not implemented")]
    NotImplemented(&'static str),
}
