use thiserror::Error;

pub type Result<T> = core::result::Result<T, DagError>;

#[derive(Error, Debug)]
pub enum DagError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("serialization failure in `{component}`{}: {message}", key_suffix(.key))]
    Serialization {
        component: String,
        key: Option<String>,
        message: String,
    },
    #[error("edge {from} -> {to} would cycle")]
    WouldCycle { from: String, to: String },
    #[error("vertex `{0}` not found")]
    VertexNotFound(String),
    #[error("vertex group `{0}` not found")]
    GroupNotFound(String),
    #[error("aborted: {0}")]
    Aborted(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" at key `{}`", key),
        None => String::new(),
    }
}

impl DagError {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        DagError::InvalidArgument(msg.into())
    }

    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        DagError::InvalidState(msg.into())
    }

    pub fn serialization<C, M>(component: C, key: Option<&str>, message: M) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        DagError::Serialization {
            component: component.into(),
            key: key.map(|k| k.to_string()),
            message: message.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, DagError::InvalidArgument(_))
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DagError::DuplicateKey(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, DagError::InvalidState(_))
    }
}
