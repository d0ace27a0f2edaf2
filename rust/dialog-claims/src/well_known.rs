//! Well-known issuers.

use std::sync::{Arc, LazyLock};

use crate::{Claim, ClaimSet, DefaultClaimSet};

/// Identity of the host operating system as an issuer.
pub const WINDOWS_ISSUER: &str = "Windows";

static WINDOWS: LazyLock<Arc<dyn ClaimSet>> =
    LazyLock::new(|| Arc::new(DefaultClaimSet::self_issued([Claim::system(WINDOWS_ISSUER)])));

/// The self-issued claim set that vouches for claims derived from host
/// principals.
pub fn windows() -> Arc<dyn ClaimSet> {
    WINDOWS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClaimType, Right};

    #[test]
    fn it_is_a_single_self_issued_system_claim() {
        let issuer = windows();

        assert!(issuer.issuer().is_self_issued());
        assert_eq!(issuer.count().unwrap(), 1);

        let claim = issuer.get(0).unwrap();
        assert_eq!(claim.claim_type(), ClaimType::System);
        assert_eq!(claim.right(), Right::Identity);
        assert_eq!(claim.value().as_text(), Some(WINDOWS_ISSUER));
    }

    #[test]
    fn it_is_shared_between_callers() {
        assert!(Arc::ptr_eq(&windows(), &windows()));
    }
}
