use std::fmt::{Debug, Write};
use std::sync::Arc;
use std::time::SystemTime;

use crate::{Claim, ClaimSetError, ClaimType, Right};

/// An issuer-scoped, queryable collection of claims describing one subject.
///
/// Queries never fail because a claim type or right is unsupported: they
/// yield an empty [`ClaimIter`] instead. The only errors are the ones a
/// particular implementation defines for its own lifecycle (for example
/// [`ClaimSetError::Disposed`]) and out-of-range indexing.
pub trait ClaimSet: Debug + Send + Sync {
    /// Number of claims in the set.
    fn count(&self) -> Result<usize, ClaimSetError>;

    /// The claim at `index`.
    fn get(&self, index: usize) -> Result<Claim, ClaimSetError>;

    /// The claim set that vouches for this one.
    fn issuer(&self) -> Issuer;

    /// When the claims stop being valid, or `None` if they never expire.
    ///
    /// This is metadata for the consuming policy layer; claim sets never
    /// enforce it themselves.
    fn expiration_time(&self) -> Option<SystemTime>;

    /// Claims matching `claim_type` and `right`; `None` matches anything.
    fn find_claims(
        &self,
        claim_type: Option<ClaimType>,
        right: Option<Right>,
    ) -> Result<ClaimIter, ClaimSetError>;

    /// Every claim in the set, in order.
    fn claims(&self) -> Result<ClaimIter, ClaimSetError> {
        self.find_claims(None, None)
    }

    /// Fail if the set can no longer answer queries.
    fn ensure_live(&self) -> Result<(), ClaimSetError> {
        Ok(())
    }
}

/// The origin of trust for a claim set.
#[derive(Debug, Clone)]
pub enum Issuer {
    /// The claim set vouches for itself.
    SelfIssued,
    /// Another claim set vouches for this one.
    Set(Arc<dyn ClaimSet>),
}

impl Issuer {
    /// Whether the claim set is its own issuer.
    pub fn is_self_issued(&self) -> bool {
        matches!(self, Issuer::SelfIssued)
    }

    /// The issuing claim set, unless self-issued.
    pub fn claim_set(&self) -> Option<&Arc<dyn ClaimSet>> {
        match self {
            Issuer::SelfIssued => None,
            Issuer::Set(claim_set) => Some(claim_set),
        }
    }
}

/// A lazily filtered iterator over a snapshot of claims.
///
/// The snapshot is shared with the claim set it came from; claims added to
/// the set afterwards are not observed.
#[derive(Debug, Clone)]
pub struct ClaimIter {
    claims: Arc<Vec<Claim>>,
    position: usize,
    claim_type: Option<ClaimType>,
    right: Option<Right>,
}

impl ClaimIter {
    /// Iterate `claims`, yielding those matching the query.
    pub fn new(
        claims: Arc<Vec<Claim>>,
        claim_type: Option<ClaimType>,
        right: Option<Right>,
    ) -> Self {
        Self {
            claims,
            position: 0,
            claim_type,
            right,
        }
    }

    /// An iterator that yields nothing.
    pub fn empty() -> Self {
        Self::new(Arc::default(), None, None)
    }
}

impl Iterator for ClaimIter {
    type Item = Claim;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(claim) = self.claims.get(self.position) {
            self.position += 1;
            if claim.matches(self.claim_type, self.right) {
                return Some(claim.clone());
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.claims.len().saturating_sub(self.position)))
    }
}

impl From<Vec<Claim>> for ClaimIter {
    fn from(claims: Vec<Claim>) -> Self {
        Self::new(Arc::new(claims), None, None)
    }
}

/// Conveniences available on every [`ClaimSet`].
pub trait ClaimSetExt: ClaimSet {
    /// Query by URI strings as they arrive from configuration or the wire.
    ///
    /// A URI that names no known claim type or right yields an empty result.
    fn find_claims_by_uri(
        &self,
        claim_type: Option<&str>,
        right: Option<&str>,
    ) -> Result<ClaimIter, ClaimSetError> {
        self.ensure_live()?;

        let claim_type = match claim_type.map(ClaimType::from_uri) {
            Some(None) => return Ok(ClaimIter::empty()),
            Some(known) => known,
            None => None,
        };
        let right = match right.map(Right::from_uri) {
            Some(None) => return Ok(ClaimIter::empty()),
            Some(known) => known,
            None => None,
        };

        self.find_claims(claim_type, right)
    }

    /// Whether the set holds a claim equal to `claim`.
    fn contains(&self, claim: &Claim) -> Result<bool, ClaimSetError> {
        Ok(self
            .find_claims(Some(claim.claim_type()), Some(claim.right()))?
            .any(|candidate| &candidate == claim))
    }

    /// A multi-line text rendering of the set, one claim per line.
    fn render(&self) -> Result<String, ClaimSetError> {
        let mut out = String::from("ClaimSet [");
        for claim in self.claims()? {
            // Writing to a String cannot fail.
            let _ = write!(out, "\n  {claim}");
        }
        out.push_str("\n]");
        Ok(out)
    }
}

impl<T: ClaimSet + ?Sized> ClaimSetExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot() -> Arc<Vec<Claim>> {
        Arc::new(vec![
            Claim::identity_sid("S-1-5-21-1-2-3-1001"),
            Claim::name("alice"),
            Claim::role("Admins"),
            Claim::role("Users"),
        ])
    }

    #[test]
    fn it_filters_lazily_by_claim_type() {
        let roles: Vec<_> = ClaimIter::new(snapshot(), Some(ClaimType::Role), None).collect();

        assert_eq!(roles, vec![Claim::role("Admins"), Claim::role("Users")]);
    }

    #[test]
    fn it_yields_everything_for_a_wildcard_query() {
        assert_eq!(ClaimIter::new(snapshot(), None, None).count(), 4);
        assert_eq!(ClaimIter::empty().count(), 0);
    }

    #[test]
    fn it_bounds_the_size_hint_by_the_remaining_snapshot() {
        let mut iter = ClaimIter::new(snapshot(), Some(ClaimType::Name), None);
        assert_eq!(iter.size_hint(), (0, Some(4)));

        iter.next();
        assert_eq!(iter.size_hint(), (0, Some(2)));
    }
}
