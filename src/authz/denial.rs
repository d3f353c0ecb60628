/// Why the engine refused a request. Every variant is terminal and produced
/// before any field of the target record is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("ownership violation: {0}")]
    OwnershipViolation(String),
    #[error("restricted field set: cannot update {}", .0.join(", "))]
    RestrictedFieldViolation(Vec<String>),
}

impl Denial {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn invalid_transition(reason: impl Into<String>) -> Self {
        Self::InvalidTransition(reason.into())
    }

    pub fn ownership(reason: impl Into<String>) -> Self {
        Self::OwnershipViolation(reason.into())
    }

    pub fn restricted_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        fields.sort();
        Self::RestrictedFieldViolation(fields)
    }
}

/// Outcome of an engine check.
pub type Decision<T> = Result<T, Denial>;

/// A value that has passed every authorization step for one actor.
///
/// Only the guard and the lifecycle module construct it, so code that applies
/// a change to a stored record can demand proof the change was checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorized<T>(T);

impl<T> Authorized<T> {
    pub(crate) fn grant(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}
