//! services/app/src/adapters/memory_auth.rs
//!
//! An in-process stand-in for the hosted auth provider. It implements the
//! `AuthProvider` port with the same observable rules as the hosted service:
//! one account per email, a minimum password length, and a single current
//! identity per process. A first provider sign-in whose email already has an
//! account is linked to that account.
//!
//! Argon2 work runs on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use todo_sync_core::ports::{AuthProvider, PortError, PortResult};
use todo_sync_core::{Identity, ProviderCredential, ProviderSignIn};
use tracing::debug;
use uuid::Uuid;

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 5;

//=========================================================================================
// Account Records
//=========================================================================================

struct Account {
    uid: String,
    email: Option<String>,
    password_hash: Option<String>,
    provider_subject: Option<String>,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            id: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}

/// A third-party account a minted token vouches for.
struct ExternalAccount {
    subject: String,
    email: Option<String>,
}

#[derive(Default)]
struct AuthInner {
    accounts: HashMap<String, Account>,
    current: Option<String>,
    issued_tokens: HashMap<String, ExternalAccount>,
}

impl AuthInner {
    fn find_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts
            .values()
            .find(|a| a.email.as_deref() == Some(email))
    }

    fn current_account(&self) -> PortResult<&Account> {
        self.current
            .as_ref()
            .and_then(|uid| self.accounts.get(uid))
            .ok_or_else(|| PortError::Unauthorized("no signed-in user".to_string()))
    }
}

//=========================================================================================
// The Adapter Struct
//=========================================================================================

#[derive(Clone, Default)]
pub struct InMemoryAuthProvider {
    inner: Arc<Mutex<AuthInner>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a third-party credential for `subject`, as the external sign-in
    /// flow would hand one to the app.
    pub fn issue_provider_credential(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> ProviderCredential {
        let id_token = Uuid::new_v4().to_string();
        self.lock().issued_tokens.insert(
            id_token.clone(),
            ExternalAccount {
                subject: subject.to_string(),
                email: email.map(normalize_email),
            },
        );
        ProviderCredential { id_token }
    }

    /// Whether an account with this id still exists.
    pub fn has_account(&self, uid: &str) -> bool {
        self.lock().accounts.contains_key(uid)
    }

    fn lock(&self) -> MutexGuard<'_, AuthInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up the stored hash for `email` and checks `password` against it.
    async fn verify(&self, email: &str, password: &str) -> PortResult<Identity> {
        let invalid = || PortError::Unauthorized("invalid email or password".to_string());
        let (identity, hash) = {
            let inner = self.lock();
            let account = inner.find_by_email(email).ok_or_else(invalid)?;
            let hash = account.password_hash.clone().ok_or_else(invalid)?;
            (account.identity(), hash)
        };

        let password = password.to_string();
        let matched = tokio::task::spawn_blocking(move || -> PortResult<bool> {
            let parsed =
                PasswordHash::new(&hash).map_err(|e| PortError::Unexpected(e.to_string()))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| PortError::Unexpected(format!("password check aborted: {}", e)))??;

        if !matched {
            return Err(invalid());
        }
        Ok(identity)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> PortResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(PortError::InvalidArgument(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

async fn hash_password(password: &str) -> PortResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PortError::Unexpected(format!("failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| PortError::Unexpected(format!("password hashing aborted: {}", e)))?
}

//=========================================================================================
// `AuthProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn create_user_with_email(&self, email: &str, password: &str) -> PortResult<Identity> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortError::InvalidArgument(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.lock().find_by_email(&email).is_some() {
            return Err(PortError::AlreadyExists(email));
        }

        let password_hash = hash_password(password).await?;
        let account = Account {
            uid: Uuid::new_v4().simple().to_string(),
            email: Some(email.clone()),
            password_hash: Some(password_hash),
            provider_subject: None,
        };
        let identity = account.identity();

        let mut inner = self.lock();
        // Re-checked under the lock that inserts.
        if inner.find_by_email(&email).is_some() {
            return Err(PortError::AlreadyExists(email));
        }
        inner.current = Some(account.uid.clone());
        inner.accounts.insert(account.uid.clone(), account);
        debug!(user_id = %identity.id, "Created account.");
        Ok(identity)
    }

    async fn sign_in_with_email(&self, email: &str, password: &str) -> PortResult<Identity> {
        let identity = self.verify(&normalize_email(email), password).await?;
        self.lock().current = Some(identity.id.clone());
        Ok(identity)
    }

    async fn sign_in_with_credential(
        &self,
        credential: &ProviderCredential,
    ) -> PortResult<ProviderSignIn> {
        let mut inner = self.lock();
        let external = inner.issued_tokens.get(&credential.id_token).ok_or_else(|| {
            PortError::Unauthorized("invalid or expired provider credential".to_string())
        })?;
        let subject = external.subject.clone();
        let email = external.email.clone();

        let returning = inner
            .accounts
            .values()
            .find(|a| a.provider_subject.as_deref() == Some(subject.as_str()))
            .map(Account::identity);
        let same_email = email
            .as_deref()
            .and_then(|e| inner.find_by_email(e))
            .map(|a| a.uid.clone());

        let (identity, is_new_user) = match (returning, same_email) {
            (Some(identity), _) => (identity, false),
            // Email already registered: link the subject instead of opening a second account.
            (None, Some(uid)) => {
                let account = inner
                    .accounts
                    .get_mut(&uid)
                    .ok_or_else(|| PortError::Unexpected(format!("account {} vanished", uid)))?;
                if account.provider_subject.is_some() {
                    return Err(PortError::AlreadyExists(
                        account.email.clone().unwrap_or_default(),
                    ));
                }
                account.provider_subject = Some(subject);
                debug!(user_id = %uid, "Linked provider subject to existing account.");
                (account.identity(), false)
            }
            (None, None) => {
                let account = Account {
                    uid: Uuid::new_v4().simple().to_string(),
                    email,
                    password_hash: None,
                    provider_subject: Some(subject),
                };
                let identity = account.identity();
                inner.accounts.insert(account.uid.clone(), account);
                (identity, true)
            }
        };
        inner.current = Some(identity.id.clone());
        Ok(ProviderSignIn {
            identity,
            is_new_user,
        })
    }

    async fn reauthenticate(&self, email: &str, password: &str) -> PortResult<()> {
        let current_id = self.lock().current_account()?.uid.clone();
        let verified = self.verify(&normalize_email(email), password).await?;
        if verified.id != current_id {
            return Err(PortError::Unauthorized(
                "credential does not belong to the signed-in user".to_string(),
            ));
        }
        Ok(())
    }

    async fn delete_current_user(&self) -> PortResult<()> {
        let mut inner = self.lock();
        let uid = inner.current_account()?.uid.clone();
        inner.accounts.remove(&uid);
        inner.current = None;
        debug!(user_id = %uid, "Deleted account.");
        Ok(())
    }

    fn sign_out(&self) -> PortResult<()> {
        self.lock().current = None;
        Ok(())
    }

    fn current_user(&self) -> Option<Identity> {
        self.lock().current_account().ok().map(Account::identity)
    }
}
