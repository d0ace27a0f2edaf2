use std::fmt::{Display, Formatter};

use dialog_principal::SecurityIdentifier;
use serde::{Deserialize, Serialize};

/// How a claim may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Right {
    /// The claim *is* the subject's identity (its SID, its name).
    Identity,
    /// The subject merely holds the claimed property.
    PossessProperty,
}

impl Right {
    /// All rights, in declaration order.
    pub const ALL: [Right; 2] = [Right::Identity, Right::PossessProperty];

    /// The URI form of this right.
    pub fn uri(&self) -> &'static str {
        match self {
            Right::Identity => "http://schemas.xmlsoap.org/ws/2005/05/identity/right/identity",
            Right::PossessProperty => {
                "http://schemas.xmlsoap.org/ws/2005/05/identity/right/possessproperty"
            }
        }
    }

    /// Look a right up by its URI form.
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|right| right.uri() == uri)
    }
}

impl Display for Right {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

/// The kinds of claim a host principal can be described by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimType {
    /// The principal's own account identifier.
    Sid,
    /// The account identifier in translated, structured form.
    WindowsSid,
    /// A SID that may only be used to deny access.
    DenyOnlySid,
    /// The display name of the principal.
    Name,
    /// A role derived from group membership.
    Role,
    /// The identity of a well-known system issuer.
    System,
}

impl ClaimType {
    /// All claim types, in declaration order.
    pub const ALL: [ClaimType; 6] = [
        ClaimType::Sid,
        ClaimType::WindowsSid,
        ClaimType::DenyOnlySid,
        ClaimType::Name,
        ClaimType::Role,
        ClaimType::System,
    ];

    /// The URI form of this claim type.
    pub fn uri(&self) -> &'static str {
        match self {
            ClaimType::Sid => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/sid",
            ClaimType::WindowsSid => {
                "http://schemas.microsoft.com/ws/2008/06/identity/claims/windowssid"
            }
            ClaimType::DenyOnlySid => {
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/denyonlysid"
            }
            ClaimType::Name => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
            ClaimType::Role => "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
            ClaimType::System => "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/system",
        }
    }

    /// Look a claim type up by its URI form.
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|claim_type| claim_type.uri() == uri)
    }
}

impl Display for ClaimType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

/// The resource a claim asserts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimValue {
    /// Textual value: an account identifier, a name or a role.
    Text(String),
    /// A structured security identifier.
    Sid(SecurityIdentifier),
}

impl ClaimValue {
    /// The text, if this is a textual value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClaimValue::Text(text) => Some(text),
            ClaimValue::Sid(_) => None,
        }
    }

    /// The identifier, if this is a structured SID.
    pub fn as_sid(&self) -> Option<&SecurityIdentifier> {
        match self {
            ClaimValue::Sid(sid) => Some(sid),
            ClaimValue::Text(_) => None,
        }
    }
}

impl Display for ClaimValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimValue::Text(text) => f.write_str(text),
            ClaimValue::Sid(sid) => write!(f, "{sid}"),
        }
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::Text(value)
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::Text(value.to_owned())
    }
}

impl From<SecurityIdentifier> for ClaimValue {
    fn from(value: SecurityIdentifier) -> Self {
        ClaimValue::Sid(value)
    }
}

/// A typed assertion about a subject, paired with a usage right.
///
/// Claims are immutable; equality compares all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    claim_type: ClaimType,
    value: ClaimValue,
    right: Right,
}

impl Claim {
    /// Create a new claim.
    pub fn new(claim_type: ClaimType, value: impl Into<ClaimValue>, right: Right) -> Self {
        Self {
            claim_type,
            value: value.into(),
            right,
        }
    }

    /// The subject's own account identifier.
    pub fn identity_sid(account: impl Into<String>) -> Self {
        Self::new(ClaimType::Sid, account.into(), Right::Identity)
    }

    /// The translated form of the subject's account identifier.
    pub fn windows_sid(sid: SecurityIdentifier) -> Self {
        Self::new(ClaimType::WindowsSid, sid, Right::PossessProperty)
    }

    /// A deny-only group identifier held by the subject.
    pub fn deny_only_sid(sid: SecurityIdentifier) -> Self {
        Self::new(ClaimType::DenyOnlySid, sid, Right::PossessProperty)
    }

    /// The subject's display name.
    pub fn name(name: impl Into<String>) -> Self {
        Self::new(ClaimType::Name, name.into(), Right::Identity)
    }

    /// A role the subject holds through group membership.
    pub fn role(role: impl Into<String>) -> Self {
        Self::new(ClaimType::Role, role.into(), Right::Identity)
    }

    /// The identity of a system issuer.
    pub fn system(identity: impl Into<String>) -> Self {
        Self::new(ClaimType::System, identity.into(), Right::Identity)
    }

    /// Get the claim type.
    pub fn claim_type(&self) -> ClaimType {
        self.claim_type
    }

    /// Get the claimed value.
    pub fn value(&self) -> &ClaimValue {
        &self.value
    }

    /// Get the usage right.
    pub fn right(&self) -> Right {
        self.right
    }

    /// Whether this claim satisfies a query; `None` matches anything.
    pub fn matches(&self, claim_type: Option<ClaimType>, right: Option<Right>) -> bool {
        claim_type.is_none_or(|claim_type| claim_type == self.claim_type)
            && right.is_none_or(|right| right == self.right)
    }
}

impl Display for Claim {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.claim_type, self.value)
    }
}
