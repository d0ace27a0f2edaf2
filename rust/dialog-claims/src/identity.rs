//! Claim sets derived from host security principals.

use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::time::SystemTime;

use dialog_principal::NativePrincipal;
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::{
    Claim, ClaimIter, ClaimSet, ClaimSetError, ClaimSetExt, ClaimSetSettings, ClaimType,
    GroupResolver, Issuer, ResolutionFailure, Right, well_known,
};

/// Claim types an identity claim set can ever contain.
const SUPPORTED_CLAIM_TYPES: [ClaimType; 4] = [
    ClaimType::Sid,
    ClaimType::WindowsSid,
    ClaimType::Name,
    ClaimType::Role,
];

/// How a claim set comes to own its principal.
#[derive(Debug)]
pub enum Ownership<'a, P> {
    /// Take over the caller's principal; the claim set releases it.
    Adopt(P),
    /// Duplicate the caller's principal; the caller keeps and releases the
    /// original, the claim set releases the duplicate.
    Duplicate(&'a P),
}

enum Materialization {
    Uninitialized,
    Computing,
    Ready(Arc<Vec<Claim>>),
}

impl Materialization {
    fn label(&self) -> &'static str {
        match self {
            Materialization::Uninitialized => "uninitialized",
            Materialization::Computing => "computing",
            Materialization::Ready(_) => "ready",
        }
    }
}

struct State<P> {
    /// `None` once disposed.
    principal: Option<Arc<P>>,
    claims: Materialization,
    failures: Vec<ResolutionFailure>,
}

/// A claim set describing a host security principal.
///
/// Claims are derived on first access and cached: the account SID, its
/// translated form when the account identifier is a well-formed account SID,
/// the display name, and (unless disabled) one role per resolved group. The
/// set owns its principal and releases it on [`IdentityClaimSet::dispose`] or
/// when dropped, whichever comes first.
pub struct IdentityClaimSet<P: NativePrincipal> {
    state: Mutex<State<P>>,
    ready: Condvar,
    authentication_type: Option<String>,
    include_groups: bool,
    expiration_time: SystemTime,
    resolver: GroupResolver,
}

/// Builder for [`IdentityClaimSet`].
pub struct IdentityClaimSetBuilder<'a, P> {
    principal: Option<Ownership<'a, P>>,
    authentication_type: Option<String>,
    expiration_time: Option<SystemTime>,
    claims: Option<Vec<Claim>>,
    resolver: Option<GroupResolver>,
    settings: ClaimSetSettings,
}

impl<'a, P: NativePrincipal> IdentityClaimSetBuilder<'a, P> {
    fn new() -> Self {
        Self {
            principal: None,
            authentication_type: None,
            expiration_time: None,
            claims: None,
            resolver: None,
            settings: ClaimSetSettings::default(),
        }
    }

    /// Set the principal and how it is owned.
    pub fn principal(mut self, ownership: Ownership<'a, P>) -> Self {
        self.principal = Some(ownership);
        self
    }

    /// Take ownership of `principal`.
    pub fn adopt(self, principal: P) -> Self {
        self.principal(Ownership::Adopt(principal))
    }

    /// Own an independent duplicate of `principal`.
    pub fn duplicate(self, principal: &'a P) -> Self {
        self.principal(Ownership::Duplicate(principal))
    }

    /// Record how the principal authenticated.
    pub fn authentication_type(mut self, authentication_type: impl Into<String>) -> Self {
        self.authentication_type = Some(authentication_type.into());
        self
    }

    /// Derive role claims from group memberships (default `true`).
    pub fn include_groups(mut self, include_groups: bool) -> Self {
        self.settings.include_groups = include_groups;
        self
    }

    /// Advertise an explicit expiration time instead of now plus the
    /// configured lifetime.
    pub fn expiration_time(mut self, expiration_time: SystemTime) -> Self {
        self.expiration_time = Some(expiration_time);
        self
    }

    /// Start out with these claims instead of deriving them.
    ///
    /// An empty list is ignored and claims are derived as usual.
    pub fn claims(mut self, claims: Vec<Claim>) -> Self {
        self.claims = Some(claims);
        self
    }

    /// Resolve groups with `resolver` rather than one built from the
    /// configured failure policy.
    pub fn resolver(mut self, resolver: GroupResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Take group, lifetime and failure-policy defaults from `settings`.
    pub fn settings(mut self, settings: ClaimSetSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the claim set.
    pub fn build(self) -> Result<IdentityClaimSet<P>, ClaimSetError> {
        let principal = match self.principal.ok_or(ClaimSetError::MissingPrincipal)? {
            Ownership::Adopt(principal) => principal,
            Ownership::Duplicate(principal) => {
                principal.duplicate(self.authentication_type.as_deref())?
            }
        };

        let expiration_time = self
            .expiration_time
            .unwrap_or_else(|| self.settings.expiration_from(SystemTime::now()));
        let claims = self
            .claims
            .filter(|claims| !claims.is_empty())
            .map(Arc::new);

        Ok(IdentityClaimSet::assemble(
            principal,
            self.authentication_type,
            self.settings.include_groups,
            expiration_time,
            self.resolver
                .unwrap_or_else(|| GroupResolver::new(self.settings.on_resolution_failure)),
            claims,
            Vec::new(),
        ))
    }
}

impl<P: NativePrincipal> IdentityClaimSet<P> {
    /// Start building a claim set.
    pub fn builder<'a>() -> IdentityClaimSetBuilder<'a, P> {
        IdentityClaimSetBuilder::new()
    }

    /// A claim set with default settings over a duplicate of `principal`.
    pub fn new(principal: &P) -> Result<Self, ClaimSetError> {
        Self::builder().duplicate(principal).build()
    }

    /// A claim set with default settings that takes over `principal`.
    pub fn adopt(principal: P) -> Self {
        let settings = ClaimSetSettings::default();
        Self::assemble(
            principal,
            None,
            settings.include_groups,
            settings.expiration_from(SystemTime::now()),
            GroupResolver::new(settings.on_resolution_failure),
            None,
            Vec::new(),
        )
    }

    fn assemble(
        principal: P,
        authentication_type: Option<String>,
        include_groups: bool,
        expiration_time: SystemTime,
        resolver: GroupResolver,
        claims: Option<Arc<Vec<Claim>>>,
        failures: Vec<ResolutionFailure>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                principal: Some(Arc::new(principal)),
                claims: claims.map_or(Materialization::Uninitialized, Materialization::Ready),
                failures,
            }),
            ready: Condvar::new(),
            authentication_type,
            include_groups,
            expiration_time,
            resolver,
        }
    }

    /// How the principal authenticated, as given at construction.
    pub fn authentication_type(&self) -> Option<&str> {
        self.authentication_type.as_deref()
    }

    /// Whether role claims are derived from groups.
    pub fn include_groups(&self) -> bool {
        self.include_groups
    }

    /// Whether [`IdentityClaimSet::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.state.lock().principal.is_none()
    }

    /// Whether the claim list has been derived (or supplied).
    pub fn is_materialized(&self) -> bool {
        matches!(self.state.lock().claims, Materialization::Ready(_))
    }

    /// Run `f` against the owned principal.
    pub fn with_principal<R>(&self, f: impl FnOnce(&P) -> R) -> Result<R, ClaimSetError> {
        let principal = self.live_principal()?;
        Ok(f(principal.as_ref()))
    }

    /// Groups that failed to resolve under
    /// [`crate::ResolutionFailurePolicy::Record`].
    pub fn resolution_failures(&self) -> Result<Vec<ResolutionFailure>, ClaimSetError> {
        self.snapshot()?;
        let state = self.state.lock();
        check_live(&state)?;
        Ok(state.failures.clone())
    }

    /// Append a claim, deriving the claim list first if needed.
    ///
    /// Clones made earlier keep the list they were made with.
    pub fn add_claim(&self, claim: Claim) -> Result<(), ClaimSetError> {
        loop {
            {
                let mut state = self.state.lock();
                check_live(&state)?;
                if let Materialization::Ready(claims) = &mut state.claims {
                    Arc::make_mut(claims).push(claim);
                    return Ok(());
                }
            }
            self.snapshot()?;
        }
    }

    /// An independent claim set over a fresh duplicate of the principal.
    ///
    /// An already derived claim list is shared with the clone, so it does not
    /// resolve groups again.
    pub fn clone_set(&self) -> Result<Self, ClaimSetError> {
        let state = self.state.lock();
        let principal = state.principal.clone().ok_or(ClaimSetError::Disposed)?;
        let claims = match &state.claims {
            Materialization::Ready(claims) => Some(claims.clone()),
            _ => None,
        };
        let failures = state.failures.clone();
        drop(state);

        let duplicate = principal.duplicate(self.authentication_type.as_deref())?;
        tracing::debug!(
            materialized = claims.is_some(),
            "Cloned identity claim set"
        );

        Ok(Self::assemble(
            duplicate,
            self.authentication_type.clone(),
            self.include_groups,
            self.expiration_time,
            self.resolver,
            claims,
            failures,
        ))
    }

    /// Release the principal. Later calls do nothing; every other operation
    /// fails with [`ClaimSetError::Disposed`] from now on.
    pub fn dispose(&self) {
        let principal = {
            let mut state = self.state.lock();
            state.claims = Materialization::Uninitialized;
            state.failures.clear();
            state.principal.take()
        };

        if let Some(principal) = principal {
            self.ready.notify_all();
            tracing::debug!("Disposed identity claim set");
            // A computation still in flight holds the last reference; the
            // principal is released when it finishes.
            drop(principal);
        }
    }

    fn live_principal(&self) -> Result<Arc<P>, ClaimSetError> {
        self.state
            .lock()
            .principal
            .clone()
            .ok_or(ClaimSetError::Disposed)
    }

    /// The derived claim list, computing it on first use.
    fn snapshot(&self) -> Result<Arc<Vec<Claim>>, ClaimSetError> {
        let mut state = self.state.lock();
        loop {
            check_live(&state)?;
            match state.claims {
                Materialization::Ready(ref claims) => return Ok(claims.clone()),
                Materialization::Computing => {
                    self.ready.wait(&mut state);
                    continue;
                }
                Materialization::Uninitialized => {}
            }

            let principal = state.principal.clone().ok_or(ClaimSetError::Disposed)?;
            state.claims = Materialization::Computing;

            let derived = MutexGuard::unlocked(&mut state, || {
                let mut abandon = Abandon {
                    set: self,
                    armed: true,
                };
                let derived = derive_claims(&*principal, self.include_groups, &self.resolver);
                abandon.armed = false;
                derived
            });

            if state.principal.is_none() {
                state.claims = Materialization::Uninitialized;
                self.ready.notify_all();
                return Err(ClaimSetError::Disposed);
            }

            let claims = Arc::new(derived.claims);
            state.claims = Materialization::Ready(claims.clone());
            state.failures = derived.failures;
            self.ready.notify_all();
            return Ok(claims);
        }
    }
}

fn check_live<P>(state: &State<P>) -> Result<(), ClaimSetError> {
    match state.principal {
        Some(_) => Ok(()),
        None => Err(ClaimSetError::Disposed),
    }
}

/// Puts the state back to `Uninitialized` if a derivation unwinds, so waiting
/// callers retry instead of blocking forever.
struct Abandon<'a, P: NativePrincipal> {
    set: &'a IdentityClaimSet<P>,
    armed: bool,
}

impl<P: NativePrincipal> Drop for Abandon<'_, P> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.set.state.lock();
            if matches!(state.claims, Materialization::Computing) {
                state.claims = Materialization::Uninitialized;
            }
            self.set.ready.notify_all();
        }
    }
}

struct Derived {
    claims: Vec<Claim>,
    failures: Vec<ResolutionFailure>,
}

fn derive_claims<P: NativePrincipal>(
    principal: &P,
    include_groups: bool,
    resolver: &GroupResolver,
) -> Derived {
    if principal.token().is_none() {
        tracing::debug!("Principal has no native token; deriving no claims");
        return Derived {
            claims: Vec::new(),
            failures: Vec::new(),
        };
    }

    let mut claims = account_claims(principal);
    claims.push(Claim::name(principal.name()));

    let mut failures = Vec::new();
    if include_groups {
        let resolution = resolver.resolve(principal);
        claims.extend(resolution.roles.into_iter().map(Claim::role));
        failures = resolution.failures;
    }

    tracing::debug!(
        claims = claims.len(),
        failures = failures.len(),
        include_groups,
        "Derived identity claims"
    );

    Derived { claims, failures }
}

/// The account SID claim and, for account-style identifiers, its translated
/// form.
fn account_claims<P: NativePrincipal>(principal: &P) -> Vec<Claim> {
    let mut claims = vec![Claim::identity_sid(principal.account())];
    if let Some(sid) = principal.account_sid().filter(|sid| sid.is_account()) {
        claims.push(Claim::windows_sid(sid));
    }
    claims
}

/// Answer a SID query straight from the principal, without deriving the
/// full claim list. Yields exactly what the derived list would.
fn find_account_claims<P: NativePrincipal>(
    principal: &P,
    claim_type: ClaimType,
    right: Option<Right>,
) -> Vec<Claim> {
    if principal.token().is_none() {
        return Vec::new();
    }

    account_claims(principal)
        .into_iter()
        .filter(|claim| claim.matches(Some(claim_type), right))
        .collect()
}

impl<P: NativePrincipal + Send + Sync> ClaimSet for IdentityClaimSet<P> {
    fn count(&self) -> Result<usize, ClaimSetError> {
        Ok(self.snapshot()?.len())
    }

    fn get(&self, index: usize) -> Result<Claim, ClaimSetError> {
        let claims = self.snapshot()?;
        claims
            .get(index)
            .cloned()
            .ok_or(ClaimSetError::IndexOutOfRange {
                index,
                count: claims.len(),
            })
    }

    fn issuer(&self) -> Issuer {
        Issuer::Set(well_known::windows())
    }

    fn expiration_time(&self) -> Option<SystemTime> {
        Some(self.expiration_time)
    }

    fn find_claims(
        &self,
        claim_type: Option<ClaimType>,
        right: Option<Right>,
    ) -> Result<ClaimIter, ClaimSetError> {
        let state = self.state.lock();
        let principal = state.principal.clone().ok_or(ClaimSetError::Disposed)?;

        if let Some(claim_type) = claim_type {
            if !SUPPORTED_CLAIM_TYPES.contains(&claim_type) {
                return Ok(ClaimIter::empty());
            }

            let materialized = matches!(state.claims, Materialization::Ready(_));
            if !materialized && matches!(claim_type, ClaimType::Sid | ClaimType::WindowsSid) {
                drop(state);
                let claims = find_account_claims(&*principal, claim_type, right);
                tracing::trace!(
                    %claim_type,
                    found = claims.len(),
                    "Answered from principal without deriving claims"
                );
                return Ok(ClaimIter::from(claims));
            }
        }
        drop(state);
        drop(principal);

        Ok(ClaimIter::new(self.snapshot()?, claim_type, right))
    }

    fn ensure_live(&self) -> Result<(), ClaimSetError> {
        check_live(&self.state.lock())
    }
}

impl<P: NativePrincipal> Debug for IdentityClaimSet<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("IdentityClaimSet")
            .field("disposed", &state.principal.is_none())
            .field("claims", &state.claims.label())
            .field("authentication_type", &self.authentication_type)
            .field("include_groups", &self.include_groups)
            .field("expiration_time", &self.expiration_time)
            .finish()
    }
}

impl<P: NativePrincipal + Send + Sync> Display for IdentityClaimSet<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.render() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => f.write_str("IdentityClaimSet (disposed)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResolutionFailurePolicy;
    use dialog_principal::SecurityIdentifier;
    use dialog_principal::memory::{MemoryHost, MemoryPrincipal};
    use pretty_assertions::assert_eq;

    const ALICE: &str = "S-1-5-21-1004336348-1177238915-682003330-1001";

    fn alice(host: &MemoryHost) -> MemoryPrincipal {
        host.logon(ALICE, "alice")
            .with_groups([host.group("DOMAIN\\Admins"), host.group("DOMAIN\\Users")])
    }

    #[test]
    fn it_derives_the_translated_sid_for_account_identifiers() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::adopt(alice(&host));

        let claims: Vec<_> = set.claims().unwrap().collect();
        assert_eq!(
            claims,
            vec![
                Claim::identity_sid(ALICE),
                Claim::windows_sid(ALICE.parse().unwrap()),
                Claim::name("alice"),
                Claim::role("Admins"),
                Claim::role("Users"),
            ]
        );
    }

    #[test]
    fn it_omits_the_translated_sid_for_non_account_identifiers() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::adopt(host.logon("S-1-5-32-544", "BUILTIN\\Administrators"));

        assert_eq!(set.count().unwrap(), 2);
        assert_eq!(set.find_claims(Some(ClaimType::WindowsSid), None).unwrap().count(), 0);
    }

    #[test]
    fn it_answers_sid_queries_without_deriving() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::adopt(alice(&host));

        let sids: Vec<_> = set.find_claims(Some(ClaimType::Sid), None).unwrap().collect();
        let translated: Vec<_> = set
            .find_claims(Some(ClaimType::WindowsSid), Some(Right::PossessProperty))
            .unwrap()
            .collect();

        assert_eq!(sids, vec![Claim::identity_sid(ALICE)]);
        assert_eq!(translated, vec![Claim::windows_sid(ALICE.parse().unwrap())]);
        assert!(!set.is_materialized());
        assert_eq!(host.translations(), 0);
    }

    #[test]
    fn it_matches_the_derived_list_on_the_fast_path() {
        let host = MemoryHost::new();
        let lazy = IdentityClaimSet::adopt(alice(&host));
        let eager = IdentityClaimSet::adopt(alice(&host));
        eager.count().unwrap();

        for claim_type in [ClaimType::Sid, ClaimType::WindowsSid] {
            for right in [None, Some(Right::Identity), Some(Right::PossessProperty)] {
                let fast: Vec<_> = lazy.find_claims(Some(claim_type), right).unwrap().collect();
                let slow: Vec<_> = eager.find_claims(Some(claim_type), right).unwrap().collect();
                assert_eq!(fast, slow, "{claim_type:?} / {right:?}");
            }
        }
        assert!(!lazy.is_materialized());
    }

    #[test]
    fn it_returns_nothing_for_unsupported_claim_types() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::adopt(alice(&host));

        assert_eq!(set.find_claims(Some(ClaimType::DenyOnlySid), None).unwrap().count(), 0);
        assert_eq!(set.find_claims(Some(ClaimType::System), None).unwrap().count(), 0);
        assert!(!set.is_materialized());
    }

    #[test]
    fn it_names_the_windows_issuer() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::adopt(alice(&host));

        let issuer = set.issuer();
        let issuer = issuer.claim_set().unwrap();
        assert!(Arc::ptr_eq(issuer, &well_known::windows()));
    }

    #[test]
    fn it_starts_from_supplied_claims() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::builder()
            .adopt(alice(&host))
            .claims(vec![Claim::name("bob")])
            .build()
            .unwrap();

        assert!(set.is_materialized());
        assert_eq!(set.claims().unwrap().collect::<Vec<_>>(), vec![Claim::name("bob")]);
        assert_eq!(set.find_claims(Some(ClaimType::Sid), None).unwrap().count(), 0);
        assert_eq!(host.translations(), 0);
    }

    #[test]
    fn it_ignores_an_empty_supplied_list() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::builder()
            .adopt(alice(&host))
            .claims(Vec::new())
            .build()
            .unwrap();

        assert!(!set.is_materialized());
        assert_eq!(set.count().unwrap(), 5);
    }

    #[test]
    fn it_prefers_an_explicit_resolver_over_settings() {
        let host = MemoryHost::new();
        let unknown: SecurityIdentifier = "S-1-5-21-9-9-9-4242".parse().unwrap();
        let set = IdentityClaimSet::builder()
            .adopt(host.logon(ALICE, "alice").with_groups([unknown]))
            .settings(ClaimSetSettings {
                on_resolution_failure: ResolutionFailurePolicy::Skip,
                ..ClaimSetSettings::default()
            })
            .resolver(GroupResolver::new(ResolutionFailurePolicy::Record))
            .build()
            .unwrap();

        assert_eq!(set.find_claims(Some(ClaimType::Role), None).unwrap().count(), 0);
        assert_eq!(set.resolution_failures().unwrap().len(), 1);
    }

    #[test]
    fn it_renders_until_disposed() {
        let host = MemoryHost::new();
        let set = IdentityClaimSet::builder()
            .adopt(host.logon("S-1-5-32-544", "admin"))
            .build()
            .unwrap();

        assert_eq!(
            set.to_string(),
            "ClaimSet [\n  http://schemas.xmlsoap.org/ws/2005/05/identity/claims/sid: S-1-5-32-544\n  http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name: admin\n]"
        );

        set.dispose();
        assert_eq!(set.to_string(), "IdentityClaimSet (disposed)");
    }
}
