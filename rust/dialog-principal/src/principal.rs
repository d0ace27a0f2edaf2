//! The platform seam: what a host operating system exposes about a logged-on
//! security principal.

use crate::{PrincipalError, SecurityIdentifier};

/// Opaque value of a native login token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenHandle(pub u64);

impl TokenHandle {
    /// The raw platform value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A host security principal: an account identifier, an optional native
/// token and the groups the account belongs to.
///
/// Ownership of the native token follows ownership of the value: whoever
/// holds a `NativePrincipal` is responsible for it, and dropping the value
/// releases the token. A second owner must obtain its own copy through
/// [`NativePrincipal::duplicate`].
pub trait NativePrincipal: Sized {
    /// The owning account identifier, usually the textual form of a SID.
    fn account(&self) -> &str;

    /// The display name of the account (e.g. `DOMAIN\alice`).
    fn name(&self) -> &str;

    /// The native token, or `None` if it is absent or invalid.
    fn token(&self) -> Option<TokenHandle>;

    /// How the principal authenticated (e.g. `Negotiate`), if known.
    fn authentication_type(&self) -> Option<&str> {
        None
    }

    /// Identifiers of the groups the principal belongs to.
    ///
    /// Implementations may enumerate lazily; the iterator is consumed once
    /// per materialization.
    fn groups(&self) -> Box<dyn Iterator<Item = SecurityIdentifier> + '_>;

    /// Translate a group identifier into its domain-qualified account name
    /// (e.g. `DOMAIN\Admins`).
    fn translate(&self, group: &SecurityIdentifier) -> Result<String, PrincipalError>;

    /// Produce an independent principal with its own native token.
    ///
    /// `authentication_type` overrides the authentication type recorded on
    /// the copy when given. Platforms that cannot duplicate a token return
    /// [`PrincipalError::DuplicationUnsupported`].
    fn duplicate(&self, authentication_type: Option<&str>) -> Result<Self, PrincipalError>;

    /// Parse [`NativePrincipal::account`] as a structured SID.
    fn account_sid(&self) -> Option<SecurityIdentifier> {
        self.account().parse().ok()
    }
}
