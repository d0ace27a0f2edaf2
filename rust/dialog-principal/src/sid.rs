//! Structured security identifiers.
//!
//! A security identifier (SID) has the textual form
//! `S-<revision>-<authority>-<sub-authority>...`, for example
//! `S-1-5-21-1004336348-1177238915-682003330-1001`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::SidParseError;

/// The only SID revision in use.
pub const SID_REVISION: u8 = 1;

/// Upper bound on sub-authorities in a single SID.
pub const MAX_SUB_AUTHORITIES: usize = 15;

/// Largest value the 48-bit identifier authority can hold.
pub const MAX_IDENTIFIER_AUTHORITY: u64 = (1 << 48) - 1;

/// Identifier authority of the NT authority (`S-1-5-...`).
pub const NT_AUTHORITY: u64 = 5;

/// First sub-authority shared by domain and machine account SIDs.
pub const NT_NON_UNIQUE: u32 = 21;

/// A parsed security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecurityIdentifier {
    identifier_authority: u64,
    sub_authorities: Vec<u32>,
}

impl SecurityIdentifier {
    /// Create an identifier from its parts.
    pub fn new(
        identifier_authority: u64,
        sub_authorities: Vec<u32>,
    ) -> Result<Self, SidParseError> {
        if identifier_authority > MAX_IDENTIFIER_AUTHORITY {
            return Err(SidParseError::AuthorityOutOfRange(identifier_authority));
        }
        if sub_authorities.is_empty() {
            return Err(SidParseError::MissingSubAuthority);
        }
        if sub_authorities.len() > MAX_SUB_AUTHORITIES {
            return Err(SidParseError::TooManySubAuthorities(sub_authorities.len()));
        }

        Ok(Self {
            identifier_authority,
            sub_authorities,
        })
    }

    /// The 48-bit identifier authority.
    pub fn identifier_authority(&self) -> u64 {
        self.identifier_authority
    }

    /// All sub-authorities, in order.
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Whether this identifier names a user, group or machine account in a
    /// domain or local account database.
    ///
    /// Account SIDs live under the NT authority with a first sub-authority of
    /// `21` followed by three domain components; a trailing RID is optional.
    pub fn is_account(&self) -> bool {
        self.identifier_authority == NT_AUTHORITY
            && self.sub_authorities.len() >= 4
            && self.sub_authorities[0] == NT_NON_UNIQUE
    }

    /// The account `rid` in the NT domain `S-1-5-21-<domain>`.
    #[cfg(any(test, feature = "helpers"))]
    pub(crate) fn account_in(domain: [u32; 3], rid: u32) -> Self {
        let [a, b, c] = domain;
        Self {
            identifier_authority: NT_AUTHORITY,
            sub_authorities: vec![NT_NON_UNIQUE, a, b, c, rid],
        }
    }
}

impl FromStr for SecurityIdentifier {
    type Err = SidParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.split('-');

        match parts.next() {
            Some(prefix) if prefix.eq_ignore_ascii_case("S") => {}
            _ => return Err(SidParseError::MissingPrefix),
        }

        let revision = parts.next().ok_or(SidParseError::MissingRevision)?;
        match leading_digit(revision).then(|| revision.parse::<u8>()) {
            Some(Ok(SID_REVISION)) => {}
            _ => return Err(SidParseError::UnsupportedRevision(revision.to_owned())),
        }

        let authority = parts.next().ok_or(SidParseError::MissingAuthority)?;
        let identifier_authority = parse_authority(authority)?;

        let sub_authorities = parts
            .map(|part| {
                leading_digit(part)
                    .then(|| part.parse::<u32>().ok())
                    .flatten()
                    .ok_or_else(|| SidParseError::InvalidSubAuthority(part.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(identifier_authority, sub_authorities)
    }
}

fn parse_authority(value: &str) -> Result<u64, SidParseError> {
    let invalid = || SidParseError::InvalidAuthority(value.to_owned());
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => {
            u64::from_str_radix(hex, 16).map_err(|_| invalid())
        }
        Some(_) => Err(invalid()),
        None if leading_digit(value) => value.parse::<u64>().map_err(|_| invalid()),
        None => Err(invalid()),
    }
}

/// Integer parsing accepts a leading `+`; identifier components do not.
fn leading_digit(value: &str) -> bool {
    value.starts_with(|c: char| c.is_ascii_digit())
}

impl Display for SecurityIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "S-{SID_REVISION}-")?;
        // Authorities that do not fit in 32 bits are written in hex.
        if self.identifier_authority >> 32 == 0 {
            write!(f, "{}", self.identifier_authority)?;
        } else {
            write!(f, "0x{:012X}", self.identifier_authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl Serialize for SecurityIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SecurityIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALICE: &str = "S-1-5-21-1004336348-1177238915-682003330-1001";

    #[test]
    fn it_parses_and_displays_an_account_sid() {
        let sid: SecurityIdentifier = ALICE.parse().unwrap();

        assert_eq!(sid.identifier_authority(), 5);
        assert_eq!(
            sid.sub_authorities(),
            &[21, 1004336348, 1177238915, 682003330, 1001]
        );
        assert_eq!(sid.to_string(), ALICE);
    }

    #[test]
    fn it_recognizes_account_sids() {
        let account: SecurityIdentifier = ALICE.parse().unwrap();
        let everyone: SecurityIdentifier = "S-1-1-0".parse().unwrap();
        let administrators: SecurityIdentifier = "S-1-5-32-544".parse().unwrap();

        assert!(account.is_account());
        assert!(!everyone.is_account());
        assert!(!administrators.is_account());
    }

    #[test]
    fn it_rejects_signed_components() {
        assert_eq!(
            "S-1-+5-21-1-2-3".parse::<SecurityIdentifier>(),
            Err(SidParseError::InvalidAuthority("+5".into()))
        );
        assert_eq!(
            "S-1-5-+21-1-2-3".parse::<SecurityIdentifier>(),
            Err(SidParseError::InvalidSubAuthority("+21".into()))
        );
        assert_eq!(
            "S-+1-5-21".parse::<SecurityIdentifier>(),
            Err(SidParseError::UnsupportedRevision("+1".into()))
        );
        assert_eq!(
            "S-1-0x+5-21".parse::<SecurityIdentifier>(),
            Err(SidParseError::InvalidAuthority("0x+5".into()))
        );
    }

    #[test]
    fn it_builds_well_formed_accounts_in_a_domain() {
        let sid = SecurityIdentifier::account_in([1111, 2222, 3333], 1100);

        assert!(sid.is_account());
        assert_eq!(sid.to_string(), "S-1-5-21-1111-2222-3333-1100");
        assert_eq!(sid.to_string().parse::<SecurityIdentifier>(), Ok(sid));
    }

    #[test]
    fn it_rejects_malformed_identifiers() {
        assert_eq!(
            "X-1-5-21".parse::<SecurityIdentifier>(),
            Err(SidParseError::MissingPrefix)
        );
        assert_eq!(
            "S-2-5-21".parse::<SecurityIdentifier>(),
            Err(SidParseError::UnsupportedRevision("2".into()))
        );
        assert_eq!(
            "S-1-5".parse::<SecurityIdentifier>(),
            Err(SidParseError::MissingSubAuthority)
        );
        assert_eq!(
            "S-1-5-21-...-1001".parse::<SecurityIdentifier>(),
            Err(SidParseError::InvalidSubAuthority("...".into()))
        );
        assert_eq!(
            "S-1-5-1-2-3-4-5-6-7-8-9-10-11-12-13-14-15-16".parse::<SecurityIdentifier>(),
            Err(SidParseError::TooManySubAuthorities(16))
        );
    }

    #[test]
    fn it_round_trips_wide_authorities_in_hex() {
        let sid: SecurityIdentifier = "S-1-0x1000000000FF-7".parse().unwrap();

        assert_eq!(sid.identifier_authority(), 0x1000000000FF);
        assert_eq!(sid.to_string(), "S-1-0x1000000000FF-7");
    }

    #[test]
    fn it_serializes_as_a_string() {
        let sid: SecurityIdentifier = ALICE.parse().unwrap();
        let json = serde_json::to_string(&sid).unwrap();

        assert_eq!(json, format!("\"{ALICE}\""));
        assert_eq!(serde_json::from_str::<SecurityIdentifier>(&json).unwrap(), sid);
    }
}
