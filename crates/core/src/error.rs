use thiserror::Error;

/// Failures surfaced by the kp core and its collaborators. Every variant
/// terminates the command; nothing here is retried locally.
#[derive(Debug, Error)]
pub enum KpError {
    /// Two mutually exclusive flags were both supplied.
    #[error("cannot use --{first} and --{second} together")]
    ConflictingInput { first: &'static str, second: &'static str },

    #[error("invalid order file {path}: {reason}")]
    InvalidOrderFile { path: String, reason: String },

    #[error("invalid buildpack selector {selector:?}: {reason}")]
    InvalidSelectorSyntax { selector: String, reason: String },

    #[error("failed to get canonical repository: use \"kp config canonical-repository\" to set")]
    MissingCanonicalRepository,

    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    #[error("{0}")]
    Conflict(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("cannot diff {before:?} against {after:?}: snapshots belong to different resources")]
    IdentityMismatch { before: String, after: String },

    #[error("refusing to submit an empty patch for {0:?}")]
    EmptyPatch(String),

    #[error("{0}")]
    Remote(String),
}

impl From<serde_json::Error> for KpError {
    fn from(e: serde_json::Error) -> Self {
        KpError::Serialization(e.to_string())
    }
}

pub type KpResult<T> = Result<T, KpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_remediation_text() {
        assert_eq!(
            KpError::MissingCanonicalRepository.to_string(),
            "failed to get canonical repository: use \"kp config canonical-repository\" to set"
        );
        let e = KpError::ConflictingInput { first: "order", second: "buildpack" };
        assert_eq!(e.to_string(), "cannot use --order and --buildpack together");
        let e = KpError::NotFound { resource: "clusterbuilders.kpack.io".into(), name: "x".into() };
        assert_eq!(e.to_string(), "clusterbuilders.kpack.io \"x\" not found");
    }
}
