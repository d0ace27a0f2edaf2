use std::sync::Arc;
use std::time::SystemTime;

use crate::{Claim, ClaimIter, ClaimSet, ClaimSetError, ClaimType, Issuer, Right};

/// A claim set backed by a fixed list of claims.
#[derive(Debug, Clone)]
pub struct DefaultClaimSet {
    issuer: Issuer,
    claims: Arc<Vec<Claim>>,
    expiration_time: Option<SystemTime>,
}

impl DefaultClaimSet {
    /// A set vouched for by `issuer`.
    pub fn new(issuer: Issuer, claims: impl IntoIterator<Item = Claim>) -> Self {
        Self {
            issuer,
            claims: Arc::new(claims.into_iter().collect()),
            expiration_time: None,
        }
    }

    /// A set that vouches for itself.
    pub fn self_issued(claims: impl IntoIterator<Item = Claim>) -> Self {
        Self::new(Issuer::SelfIssued, claims)
    }

    /// Attach an expiration time.
    pub fn expiring_at(mut self, expiration_time: SystemTime) -> Self {
        self.expiration_time = Some(expiration_time);
        self
    }
}

impl ClaimSet for DefaultClaimSet {
    fn count(&self) -> Result<usize, ClaimSetError> {
        Ok(self.claims.len())
    }

    fn get(&self, index: usize) -> Result<Claim, ClaimSetError> {
        self.claims
            .get(index)
            .cloned()
            .ok_or(ClaimSetError::IndexOutOfRange {
                index,
                count: self.claims.len(),
            })
    }

    fn issuer(&self) -> Issuer {
        self.issuer.clone()
    }

    fn expiration_time(&self) -> Option<SystemTime> {
        self.expiration_time
    }

    fn find_claims(
        &self,
        claim_type: Option<ClaimType>,
        right: Option<Right>,
    ) -> Result<ClaimIter, ClaimSetError> {
        Ok(ClaimIter::new(self.claims.clone(), claim_type, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClaimSetExt;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_indexes_within_bounds_only() {
        let set = DefaultClaimSet::self_issued([Claim::name("alice")]);

        assert_eq!(set.get(0).unwrap(), Claim::name("alice"));
        assert_eq!(
            set.get(1),
            Err(ClaimSetError::IndexOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn it_expires_only_when_asked() {
        let at = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        let open = DefaultClaimSet::self_issued([Claim::name("alice")]);
        let closing = open.clone().expiring_at(at);

        assert_eq!(open.expiration_time(), None);
        assert_eq!(closing.expiration_time(), Some(at));
        assert_eq!(closing.count().unwrap(), 1);
    }

    #[test]
    fn it_answers_unknown_uris_with_nothing() {
        let set = DefaultClaimSet::self_issued([Claim::name("alice")]);

        assert_eq!(set.find_claims_by_uri(Some("urn:nope"), None).unwrap().count(), 0);
        assert_eq!(set.find_claims_by_uri(None, Some("urn:nope")).unwrap().count(), 0);
        assert_eq!(
            set.find_claims_by_uri(Some(ClaimType::Name.uri()), None)
                .unwrap()
                .count(),
            1
        );
    }

    #[test]
    fn it_renders_its_claims() {
        let set = DefaultClaimSet::self_issued([Claim::name("alice"), Claim::role("Users")]);

        assert_eq!(
            set.render().unwrap(),
            "ClaimSet [\n  http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name: alice\n  http://schemas.microsoft.com/ws/2008/06/identity/claims/role: Users\n]"
        );
        assert!(set.contains(&Claim::role("Users")).unwrap());
        assert!(!set.contains(&Claim::role("Admins")).unwrap());
    }
}
