//! crates/todo_sync_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Persisted types carry the field names the document store uses, so the
//! same structs serve as both domain model and wire shape.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Collection holding one Owner Record per identity, keyed by identity id.
pub const USERS: &str = "users";

/// Collection holding every to-do item, each with a denormalized owner.
pub const TODOS: &str = "todos";

/// Nested field the live query filters on.
pub const OWNER_ID_FIELD: &str = "createdBy.userId";

//=========================================================================================
// Identity and Ownership
//=========================================================================================

/// The authenticated user as known to the remote auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

/// Denormalized identity data stored in the `users` collection and copied
/// into every to-do item the identity creates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnerRecord {
    pub user_id: String,
    pub user_email: Option<String>,
}

impl From<&Identity> for OwnerRecord {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.id.clone(),
            user_email: identity.email.clone(),
        }
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Todo {
    pub id: String,
    pub name: String,
    pub created_by: OwnerRecord,
    pub done: bool,
}

//=========================================================================================
// Credential Cache
//=========================================================================================

/// How the current session was last authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    None,
    Password(String),
    Provider,
}

/// Returned when a persisted credential entry claims both auth methods.
#[derive(Debug, thiserror::Error)]
#[error("credential entry has both provider and password auth set")]
pub struct ConflictingAuthFlags;

/// Local record of which authentication method was last used.
///
/// Fields are private: the only constructors keep `auth_via_provider` and
/// `auth_via_password` mutually exclusive, and deserialization rejects an
/// entry that has both set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "StoredCredentials", into = "StoredCredentials")]
pub struct CredentialCacheEntry {
    password: String,
    auth_via_provider: bool,
    auth_via_password: bool,
}

impl CredentialCacheEntry {
    /// Entry written after a successful email/password sign-up or sign-in.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            auth_via_provider: false,
            auth_via_password: true,
        }
    }

    /// Entry written after a successful third-party sign-in.
    pub fn with_provider() -> Self {
        Self {
            password: String::new(),
            auth_via_provider: true,
            auth_via_password: false,
        }
    }

    /// Entry written on sign-out and account deletion.
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn auth_via_provider(&self) -> bool {
        self.auth_via_provider
    }

    pub fn auth_via_password(&self) -> bool {
        self.auth_via_password
    }

    pub fn is_cleared(&self) -> bool {
        *self == Self::cleared()
    }

    pub fn method(&self) -> AuthMethod {
        match (self.auth_via_provider, self.auth_via_password) {
            (true, _) => AuthMethod::Provider,
            (false, true) => AuthMethod::Password(self.password.clone()),
            (false, false) => AuthMethod::None,
        }
    }
}

/// On-disk shape of a credential entry. Absent keys read as empty/false.
#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
struct StoredCredentials {
    password: String,
    auth_provider: bool,
    auth_password: bool,
}

impl TryFrom<StoredCredentials> for CredentialCacheEntry {
    type Error = ConflictingAuthFlags;

    fn try_from(stored: StoredCredentials) -> Result<Self, Self::Error> {
        if stored.auth_provider && stored.auth_password {
            return Err(ConflictingAuthFlags);
        }
        Ok(Self {
            password: stored.password,
            auth_via_provider: stored.auth_provider,
            auth_via_password: stored.auth_password,
        })
    }
}

impl From<CredentialCacheEntry> for StoredCredentials {
    fn from(entry: CredentialCacheEntry) -> Self {
        Self {
            password: entry.password,
            auth_provider: entry.auth_via_provider,
            auth_password: entry.auth_via_password,
        }
    }
}

//=========================================================================================
// Third-party Sign-in
//=========================================================================================

/// An opaque credential obtained from the third-party sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredential {
    pub id_token: String,
}

/// Outcome of exchanging a [`ProviderCredential`] for a session.
#[derive(Debug, Clone)]
pub struct ProviderSignIn {
    pub identity: Identity,
    pub is_new_user: bool,
}

//=========================================================================================
// Document Store Shapes
//=========================================================================================

/// A raw record from the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Equality filter on a dotted, possibly nested, field path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub path: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Filter selecting the to-do items owned by `owner_id`.
    pub fn owned_by(owner_id: &str) -> Self {
        Self::equals(OWNER_ID_FIELD, owner_id)
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.path
            .split('.')
            .try_fold(data, |node, segment| node.get(segment))
            .is_some_and(|found| *found == self.value)
    }
}
