#![warn(missing_docs)]

//! Host security principals for dialog-claims.
//!
//! This crate describes what a host operating system knows about a logged-on
//! account: its [`SecurityIdentifier`], display name, native token and group
//! memberships. The [`NativePrincipal`] trait is the seam a platform binding
//! implements; `dialog-claims` turns any implementation into a claim set.
//!
//! Implementations:
//! - **Memory** (enabled by the `helpers` feature) — an in-process host that
//!   issues, duplicates, translates and releases principals.

mod error;
pub use error::*;

mod sid;
pub use sid::*;

mod principal;
pub use principal::*;

#[cfg(any(test, feature = "helpers"))]
pub mod memory;
