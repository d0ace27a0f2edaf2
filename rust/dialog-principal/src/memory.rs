//! An in-memory host security subsystem.
//!
//! [`MemoryHost`] stands in for the operating system: it issues token
//! handles, keeps the SID-to-account-name table used for translation and
//! records every release, so callers can check that each handle is released
//! exactly once.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{NativePrincipal, PrincipalError, SecurityIdentifier, TokenHandle};

/// Domain of the groups minted by [`MemoryHost::group`].
const MEMORY_DOMAIN: [u32; 3] = [1111, 2222, 3333];

/// First RID handed out by [`MemoryHost::group`].
const FIRST_GROUP_RID: u32 = 1100;

#[derive(Debug)]
struct HostState {
    next_handle: u64,
    next_rid: u32,
    live: BTreeSet<u64>,
    releases: BTreeMap<u64, usize>,
    accounts: HashMap<SecurityIdentifier, String>,
    translations: usize,
    duplicable: bool,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            next_handle: 1,
            next_rid: FIRST_GROUP_RID,
            live: BTreeSet::new(),
            releases: BTreeMap::new(),
            accounts: HashMap::new(),
            translations: 0,
            duplicable: true,
        }
    }
}

/// A shared, cloneable in-memory host.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl MemoryHost {
    /// Create an empty host that supports duplication.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later [`NativePrincipal::duplicate`] call fail.
    pub fn refuse_duplication(&self) {
        self.state.lock().duplicable = false;
    }

    /// Register the account name a SID translates to.
    pub fn register(&self, sid: SecurityIdentifier, name: impl Into<String>) {
        self.state.lock().accounts.insert(sid, name.into());
    }

    /// Mint a fresh group SID that translates to `name`.
    pub fn group(&self, name: impl Into<String>) -> SecurityIdentifier {
        let mut state = self.state.lock();
        let rid = state.next_rid;
        state.next_rid += 1;

        let sid = SecurityIdentifier::account_in(MEMORY_DOMAIN, rid);
        state.accounts.insert(sid.clone(), name.into());
        sid
    }

    /// Log on an account, issuing a live token.
    pub fn logon(&self, account: impl Into<String>, name: impl Into<String>) -> MemoryPrincipal {
        let token = self.issue();
        MemoryPrincipal {
            host: self.clone(),
            account: account.into(),
            name: name.into(),
            token: Some(token),
            authentication_type: None,
            groups: Vec::new(),
        }
    }

    /// A principal whose native token is absent.
    pub fn tokenless(
        &self,
        account: impl Into<String>,
        name: impl Into<String>,
    ) -> MemoryPrincipal {
        MemoryPrincipal {
            host: self.clone(),
            account: account.into(),
            name: name.into(),
            token: None,
            authentication_type: None,
            groups: Vec::new(),
        }
    }

    /// Number of translation requests served so far.
    pub fn translations(&self) -> usize {
        self.state.lock().translations
    }

    /// How many times `token` has been released.
    pub fn releases(&self, token: TokenHandle) -> usize {
        self.state
            .lock()
            .releases
            .get(&token.raw())
            .copied()
            .unwrap_or(0)
    }

    /// Whether `token` is issued and not yet released.
    pub fn is_live(&self, token: TokenHandle) -> bool {
        self.state.lock().live.contains(&token.raw())
    }

    /// Number of tokens currently live.
    pub fn live_tokens(&self) -> usize {
        self.state.lock().live.len()
    }

    fn issue(&self) -> TokenHandle {
        let mut state = self.state.lock();
        let handle = state.next_handle;
        state.next_handle += 1;
        state.live.insert(handle);
        TokenHandle(handle)
    }

    fn release(&self, token: TokenHandle) {
        let mut state = self.state.lock();
        state.live.remove(&token.raw());
        *state.releases.entry(token.raw()).or_default() += 1;
    }
}

/// A principal issued by a [`MemoryHost`]. Dropping it releases its token.
#[derive(Debug)]
pub struct MemoryPrincipal {
    host: MemoryHost,
    account: String,
    name: String,
    token: Option<TokenHandle>,
    authentication_type: Option<String>,
    groups: Vec<SecurityIdentifier>,
}

impl MemoryPrincipal {
    /// Add group memberships.
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = SecurityIdentifier>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// Record how the principal authenticated.
    pub fn with_authentication_type(mut self, authentication_type: impl Into<String>) -> Self {
        self.authentication_type = Some(authentication_type.into());
        self
    }
}

impl NativePrincipal for MemoryPrincipal {
    fn account(&self) -> &str {
        &self.account
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn token(&self) -> Option<TokenHandle> {
        self.token
    }

    fn authentication_type(&self) -> Option<&str> {
        self.authentication_type.as_deref()
    }

    fn groups(&self) -> Box<dyn Iterator<Item = SecurityIdentifier> + '_> {
        Box::new(self.groups.iter().cloned())
    }

    fn translate(&self, group: &SecurityIdentifier) -> Result<String, PrincipalError> {
        let mut state = self.host.state.lock();
        state.translations += 1;
        state
            .accounts
            .get(group)
            .cloned()
            .ok_or_else(|| PrincipalError::Translation {
                sid: group.clone(),
                reason: "no account maps to this identifier".into(),
            })
    }

    fn duplicate(&self, authentication_type: Option<&str>) -> Result<Self, PrincipalError> {
        if !self.host.state.lock().duplicable {
            return Err(PrincipalError::DuplicationUnsupported(
                "host refuses token duplication".into(),
            ));
        }

        let token = self.token.map(|_| self.host.issue());
        Ok(Self {
            host: self.host.clone(),
            account: self.account.clone(),
            name: self.name.clone(),
            token,
            authentication_type: authentication_type
                .map(str::to_owned)
                .or_else(|| self.authentication_type.clone()),
            groups: self.groups.clone(),
        })
    }
}

impl Drop for MemoryPrincipal {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.host.release(token);
        }
    }
}
