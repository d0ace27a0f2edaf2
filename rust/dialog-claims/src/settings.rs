use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::ResolutionFailurePolicy;

/// Groups are turned into role claims unless configured otherwise.
pub const DEFAULT_INCLUDE_GROUPS: bool = true;

/// How long an identity claim set is advertised as valid.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(10 * 60 * 60);

/// Host-level defaults for identity claim sets.
///
/// Every field has a default, so a partial document (or none at all) is a
/// valid configuration:
///
/// ```
/// use dialog_claims::ClaimSetSettings;
///
/// let settings: ClaimSetSettings =
///     serde_json::from_str(r#"{ "include_groups": false }"#).unwrap();
/// assert!(!settings.include_groups);
/// assert_eq!(settings.lifetime().as_secs(), 36_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimSetSettings {
    /// Derive role claims from group memberships.
    pub include_groups: bool,
    /// Seconds between construction and the advertised expiration time.
    pub lifetime_secs: u64,
    /// What to do with groups that fail to resolve.
    pub on_resolution_failure: ResolutionFailurePolicy,
}

impl ClaimSetSettings {
    /// The configured lifetime.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    /// When a claim set created at `now` expires.
    ///
    /// A lifetime the platform clock cannot represent is clamped to a
    /// far-future time instead of overflowing.
    pub fn expiration_from(&self, now: SystemTime) -> SystemTime {
        let mut lifetime = self.lifetime();
        loop {
            match now.checked_add(lifetime) {
                Some(expiration) => return expiration,
                None => lifetime /= 2,
            }
        }
    }
}

impl Default for ClaimSetSettings {
    fn default() -> Self {
        Self {
            include_groups: DEFAULT_INCLUDE_GROUPS,
            lifetime_secs: DEFAULT_LIFETIME.as_secs(),
            on_resolution_failure: ResolutionFailurePolicy::default(),
        }
    }
}
