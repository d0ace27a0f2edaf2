use dialog_principal::PrincipalError;

/// Errors that can occur when building or querying a claim set.
///
/// An unsupported query is not an error: it yields an empty result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimSetError {
    /// A claim set was built without a principal.
    #[error("A principal is required to build an identity claim set")]
    MissingPrincipal,

    /// The claim set was disposed and its principal released.
    #[error("Claim set has been disposed")]
    Disposed,

    /// Indexed access outside `[0, count)`.
    #[error("Claim index {index} is out of range for a set of {count} claims")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of claims in the set.
        count: usize,
    },

    /// The principal could not be duplicated for a new owner.
    #[error("Principal error: {0}")]
    Principal(#[from] PrincipalError),
}
