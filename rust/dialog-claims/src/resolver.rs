//! Translation of group memberships into role names.

use dialog_principal::{NativePrincipal, SecurityIdentifier};
use serde::{Deserialize, Serialize};

/// Separates the domain from the account in a qualified name.
pub const DOMAIN_SEPARATOR: char = '\\';

/// What to do with a group that cannot be resolved to a role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionFailurePolicy {
    /// Drop the group silently.
    #[default]
    Skip,
    /// Drop the group and keep a [`ResolutionFailure`] diagnostic.
    Record,
}

/// A group that produced no role claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// The group identifier that failed.
    pub group: SecurityIdentifier,
    /// Why it failed.
    pub reason: String,
}

/// Roles resolved from a principal's groups, plus any recorded failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Role names, in group enumeration order.
    pub roles: Vec<String>,
    /// Failures kept under [`ResolutionFailurePolicy::Record`].
    pub failures: Vec<ResolutionFailure>,
}

/// Turns native group identifiers into bare role names.
///
/// Each group is translated to its domain-qualified account name and the
/// domain is stripped, so `DOMAIN\Admins` becomes `Admins`. A group that
/// fails never prevents the others from resolving.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupResolver {
    policy: ResolutionFailurePolicy,
}

impl GroupResolver {
    /// Create a resolver with the given failure policy.
    pub fn new(policy: ResolutionFailurePolicy) -> Self {
        Self { policy }
    }

    /// Resolve one group identifier to a role name.
    ///
    /// Only a failed translation is a failure. A name such as `DOMAIN\`
    /// resolves to the empty role.
    pub fn resolve_group<P: NativePrincipal>(
        &self,
        principal: &P,
        group: &SecurityIdentifier,
    ) -> Result<String, ResolutionFailure> {
        let account = principal
            .translate(group)
            .map_err(|error| ResolutionFailure {
                group: group.clone(),
                reason: error.to_string(),
            })?;

        Ok(role_name(&account).to_owned())
    }

    /// Resolve every group the principal belongs to.
    pub fn resolve<P: NativePrincipal>(&self, principal: &P) -> Resolution {
        let mut resolution = Resolution::default();

        for group in principal.groups() {
            match self.resolve_group(principal, &group) {
                Ok(role) => resolution.roles.push(role),
                Err(failure) => match self.policy {
                    ResolutionFailurePolicy::Skip => {
                        tracing::debug!(
                            group = %failure.group,
                            reason = %failure.reason,
                            "Skipping unresolvable group"
                        );
                    }
                    ResolutionFailurePolicy::Record => {
                        tracing::warn!(
                            group = %failure.group,
                            reason = %failure.reason,
                            "Group did not resolve to a role"
                        );
                        resolution.failures.push(failure);
                    }
                },
            }
        }

        resolution
    }
}

/// The role component of a domain-qualified account name.
///
/// `DOMAIN\Admins` yields `Admins`; a name without a separator is returned
/// whole.
pub fn role_name(account: &str) -> &str {
    let mut segments = account.split(DOMAIN_SEPARATOR);
    match (segments.next(), segments.next()) {
        (_, Some(role)) => role,
        _ => account,
    }
}
