#![warn(missing_docs)]

//! Claims-based identity for host security principals.
//!
//! This crate turns a host principal (an account SID, a native login token
//! and the account's group memberships) into an immutable, queryable
//! [`ClaimSet`] that an authorization layer can consult.
//!
//! # Quick Example
//!
//! ```rust
//! use dialog_claims::{ClaimSet, ClaimType, IdentityClaimSet, Right};
//! use dialog_principal::memory::MemoryHost;
//!
//! let host = MemoryHost::new();
//! let principal = host
//!     .logon("S-1-5-21-1004336348-1177238915-682003330-1001", "alice")
//!     .with_groups([host.group("DOMAIN\\Admins")]);
//!
//! let claims = IdentityClaimSet::new(&principal).unwrap();
//!
//! let roles: Vec<_> = claims
//!     .find_claims(Some(ClaimType::Role), Some(Right::Identity))
//!     .unwrap()
//!     .collect();
//! assert_eq!(roles[0].value().as_text(), Some("Admins"));
//!
//! claims.dispose();
//! assert!(claims.count().is_err());
//! ```
//!
//! # Core Concepts
//!
//! ## Claims and rights
//!
//! A [`Claim`] pairs a [`ClaimType`] and a [`ClaimValue`] with a [`Right`]:
//! `Identity` for claims that *are* the subject (its SID, its name, its
//! roles) and `PossessProperty` for claims the subject merely holds (the
//! translated form of its SID).
//!
//! ## Claim sets
//!
//! [`ClaimSet`] is the query contract: count, index, enumerate, and
//! [`ClaimSet::find_claims`] where `None` is a wildcard. Asking for something
//! a set can never contain yields nothing rather than an error.
//!
//! ## Identity claim sets
//!
//! [`IdentityClaimSet`] owns a [`dialog_principal::NativePrincipal`] and
//! derives its claims once, on first use:
//!
//! ```text
//! Sid        (Identity)          account identifier
//! WindowsSid (PossessProperty)   structured SID, account identifiers only
//! Name       (Identity)          display name
//! Role       (Identity) * n      one per resolved group, if enabled
//! ```
//!
//! Its issuer is the well-known [`well_known::windows`] claim set.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`Claim`] | Typed assertion with a usage right |
//! | [`ClaimSet`] | Query contract |
//! | [`DefaultClaimSet`] | Fixed, list-backed claim set |
//! | [`IdentityClaimSet`] | Claim set over a host principal |
//! | [`GroupResolver`] | Group SID to role name translation |
//! | [`ClaimSetSettings`] | Host-level defaults |

mod error;
pub use error::*;

mod claim;
pub use claim::*;

mod claim_set;
pub use claim_set::*;

mod default;
pub use default::*;

pub mod well_known;

mod resolver;
pub use resolver::*;

mod settings;
pub use settings::*;

mod identity;
pub use identity::*;
