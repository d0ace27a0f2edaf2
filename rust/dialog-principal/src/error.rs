//! Error types for host principals.

use thiserror::Error;

use crate::SecurityIdentifier;

/// Errors that can occur when parsing a [`SecurityIdentifier`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SidParseError {
    /// The leading `S` is missing.
    #[error("missing 'S' prefix")]
    MissingPrefix,

    /// There is no revision component.
    #[error("missing revision")]
    MissingRevision,

    /// The revision is not `1`.
    #[error("unsupported revision '{0}'")]
    UnsupportedRevision(String),

    /// There is no identifier authority component.
    #[error("missing identifier authority")]
    MissingAuthority,

    /// The identifier authority is not a decimal or `0x` hex number.
    #[error("invalid identifier authority '{0}'")]
    InvalidAuthority(String),

    /// The identifier authority does not fit in 48 bits.
    #[error("identifier authority {0} exceeds 48 bits")]
    AuthorityOutOfRange(u64),

    /// A sub-authority is not a 32-bit decimal number.
    #[error("invalid sub-authority '{0}'")]
    InvalidSubAuthority(String),

    /// No sub-authorities follow the identifier authority.
    #[error("at least one sub-authority is required")]
    MissingSubAuthority,

    /// More than fifteen sub-authorities.
    #[error("{0} sub-authorities exceed the maximum of 15")]
    TooManySubAuthorities(usize),
}

/// Errors raised by a [`crate::NativePrincipal`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrincipalError {
    /// The platform cannot hand a second owner its own copy of this principal.
    #[error("principal duplication is not supported: {0}")]
    DuplicationUnsupported(String),

    /// A group identifier could not be translated to an account name.
    #[error("failed to translate {sid}: {reason}")]
    Translation {
        /// The identifier that failed to translate.
        sid: SecurityIdentifier,
        /// Platform-specific description of the failure.
        reason: String,
    },
}
