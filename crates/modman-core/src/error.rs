use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T, E = ModError> = std::result::Result<T, E>;

/// Why a network request did not produce a usable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    Transport(String),
    Status(u16),
    Body(String),
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Status(code) => write!(f, "server responded with status {code}"),
            Self::Body(message) => write!(f, "unreadable response body: {message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModErrorKind {
    Fetch,
    NotFound,
    NoArtifact,
    CorruptArchive,
    Filesystem,
    RegistryCorrupt,
    InvalidPackageId,
    WorkerLost,
}

#[derive(Debug, thiserror::Error)]
pub enum ModError {
    #[error("failed to fetch {url}: {cause}")]
    Fetch { url: String, cause: FetchCause },

    #[error("no published release found for '{package_id}'")]
    NotFound { package_id: String },

    #[error("release {version} of '{package_id}' has no {expected} asset attached")]
    NoArtifact {
        package_id: String,
        version: String,
        expected: &'static str,
    },

    #[error("archive for '{package_id}' is not readable: {reason}")]
    CorruptArchive { package_id: String, reason: String },

    #[error("failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("installed-package registry {} is corrupt: {source}", path.display())]
    RegistryCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid package identifier '{value}': {reason}")]
    InvalidPackageId { value: String, reason: &'static str },

    #[error("background worker for '{package_id}' stopped without reporting a result")]
    WorkerLost { package_id: String },
}

impl ModError {
    pub fn kind(&self) -> ModErrorKind {
        match self {
            Self::Fetch { .. } => ModErrorKind::Fetch,
            Self::NotFound { .. } => ModErrorKind::NotFound,
            Self::NoArtifact { .. } => ModErrorKind::NoArtifact,
            Self::CorruptArchive { .. } => ModErrorKind::CorruptArchive,
            Self::Filesystem { .. } => ModErrorKind::Filesystem,
            Self::RegistryCorrupt { .. } => ModErrorKind::RegistryCorrupt,
            Self::InvalidPackageId { .. } => ModErrorKind::InvalidPackageId,
            Self::WorkerLost { .. } => ModErrorKind::WorkerLost,
        }
    }

    pub fn fetch(url: impl Into<String>, cause: FetchCause) -> Self {
        Self::Fetch {
            url: url.into(),
            cause,
        }
    }

    pub fn filesystem(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}
