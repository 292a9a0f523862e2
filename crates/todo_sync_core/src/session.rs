//! crates/todo_sync_core/src/session.rs
//!
//! The Session Manager: identity lifecycle plus the credential cache that
//! account deletion later reads to decide how to re-authenticate.

use crate::domain::{
    AuthMethod, CredentialCacheEntry, FieldFilter, Identity, OwnerRecord, ProviderCredential,
    TODOS, USERS,
};
use crate::error::{CoreError, CoreResult, Precondition};
use crate::ports::{AuthProvider, CredentialCache, DocumentStore, PortError, ProviderSessionClient};
use crate::response::Response;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SessionManager {
    auth: Arc<dyn AuthProvider>,
    provider_session: Arc<dyn ProviderSessionClient>,
    store: Arc<dyn DocumentStore>,
    credentials: Arc<dyn CredentialCache>,
}

impl SessionManager {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        provider_session: Arc<dyn ProviderSessionClient>,
        store: Arc<dyn DocumentStore>,
        credentials: Arc<dyn CredentialCache>,
    ) -> Self {
        Self {
            auth,
            provider_session,
            store,
            credentials,
        }
    }

    /// The presently authenticated identity, if any.
    pub fn current_identity(&self) -> Option<Identity> {
        self.auth.current_user()
    }

    /// Point-in-time check; does not follow later sign-ins or sign-outs.
    pub fn is_authenticated(&self) -> bool {
        self.current_identity().is_some()
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Response<bool> {
        info!("Signing up new account.");
        settle("sign up", self.try_sign_up(email, password).await)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Response<bool> {
        info!("Signing in with email.");
        settle("sign in", self.try_sign_in(email, password).await)
    }

    pub async fn sign_in_with_provider(&self, credential: &ProviderCredential) -> Response<bool> {
        info!("Signing in with provider credential.");
        settle(
            "provider sign in",
            self.try_sign_in_with_provider(credential).await,
        )
    }

    /// Revokes the provider session and the auth session, then clears the
    /// credential cache. The cache is left untouched if either revocation fails.
    pub async fn sign_out(&self) -> Response<bool> {
        info!("Signing out.");
        settle("sign out", self.try_sign_out().await)
    }

    /// Re-authenticates using the cached method, then removes the identity,
    /// every to-do it owns and its Owner Record.
    ///
    /// The steps are not transactional. If a store step fails after the
    /// identity is gone, its to-dos or Owner Record stay behind until
    /// [`SessionManager::purge_owner_data`] is run for that id.
    pub async fn delete_account(&self) -> Response<bool> {
        info!("Deleting account.");
        settle("delete account", self.try_delete_account().await)
    }

    /// Deletes every to-do stamped with `owner_id` and then its Owner Record.
    /// Safe to repeat; returns how many to-dos were removed this time.
    pub async fn purge_owner_data(&self, owner_id: &str) -> CoreResult<usize> {
        let owned = self
            .store
            .query(TODOS, &FieldFilter::owned_by(owner_id))
            .await
            .map_err(CoreError::StoreReadFailure)?;
        debug!(user_id = %owner_id, count = owned.len(), "Deleting owned todos.");
        for todo in &owned {
            self.store
                .delete(TODOS, &todo.id)
                .await
                .map_err(CoreError::StoreWriteFailure)?;
        }
        self.store
            .delete(USERS, owner_id)
            .await
            .map_err(CoreError::StoreWriteFailure)?;
        Ok(owned.len())
    }

    //=====================================================================================
    // Operation Bodies
    //=====================================================================================

    async fn try_sign_up(&self, email: &str, password: &str) -> CoreResult<()> {
        let identity = self
            .auth
            .create_user_with_email(email, password)
            .await
            .map_err(CoreError::AuthFailure)?;
        self.add_owner_record(&identity).await?;
        self.save_credentials(CredentialCacheEntry::with_password(password))
            .await?;
        info!(user_id = %identity.id, "Account created.");
        Ok(())
    }

    async fn try_sign_in(&self, email: &str, password: &str) -> CoreResult<()> {
        let identity = self
            .auth
            .sign_in_with_email(email, password)
            .await
            .map_err(CoreError::AuthFailure)?;
        self.save_credentials(CredentialCacheEntry::with_password(password))
            .await?;
        info!(user_id = %identity.id, "Signed in.");
        Ok(())
    }

    async fn try_sign_in_with_provider(&self, credential: &ProviderCredential) -> CoreResult<()> {
        let outcome = self
            .auth
            .sign_in_with_credential(credential)
            .await
            .map_err(CoreError::ProviderExchangeFailure)?;
        if outcome.is_new_user {
            debug!(user_id = %outcome.identity.id, "First provider sign-in, creating owner record.");
            self.add_owner_record(&outcome.identity).await?;
        }
        self.save_credentials(CredentialCacheEntry::with_provider()).await?;
        info!(user_id = %outcome.identity.id, "Signed in with provider.");
        Ok(())
    }

    async fn try_sign_out(&self) -> CoreResult<()> {
        // Both revocations are attempted; the first failure wins.
        let provider = self.provider_session.sign_out().await;
        let auth = self.auth.sign_out();
        provider.and(auth).map_err(CoreError::AuthFailure)?;
        self.save_credentials(CredentialCacheEntry::cleared()).await
    }

    async fn try_delete_account(&self) -> CoreResult<()> {
        // 1. Read how this session was authenticated.
        let cached = self
            .credentials
            .load()
            .await
            .map_err(CoreError::CredentialCacheFailure)?;
        let identity = self
            .current_identity()
            .ok_or(Precondition::NotAuthenticated)?;

        // 2. Re-authenticate by the cached method.
        match cached.method() {
            AuthMethod::Provider => {
                self.provider_session
                    .sign_out()
                    .await
                    .map_err(CoreError::AuthFailure)?;
            }
            AuthMethod::Password(password) => {
                let email = identity
                    .email
                    .as_deref()
                    .ok_or(Precondition::MissingEmail)?;
                self.auth
                    .reauthenticate(email, &password)
                    .await
                    .map_err(CoreError::AuthFailure)?;
            }
            AuthMethod::None => {
                debug!("No cached auth method, deleting without re-authentication.");
            }
        }

        // 3. Remove the identity, then everything stamped with it.
        self.auth
            .delete_current_user()
            .await
            .map_err(CoreError::AuthFailure)?;

        self.purge_owner_data(&identity.id).await?;

        // 4. Same local reset as a sign-out, minus the provider revocation.
        self.auth.sign_out().map_err(CoreError::AuthFailure)?;
        self.save_credentials(CredentialCacheEntry::cleared()).await?;
        info!(user_id = %identity.id, "Account deleted.");
        Ok(())
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    async fn add_owner_record(&self, identity: &Identity) -> CoreResult<()> {
        let record = serde_json::to_value(OwnerRecord::from(identity))
            .map_err(|e| CoreError::StoreWriteFailure(PortError::Malformed(e.to_string())))?;
        self.store
            .set(USERS, &identity.id, record)
            .await
            .map_err(CoreError::StoreWriteFailure)
    }

    async fn save_credentials(&self, entry: CredentialCacheEntry) -> CoreResult<()> {
        self.credentials
            .save(&entry)
            .await
            .map_err(CoreError::CredentialCacheFailure)
    }
}

/// Turns an operation outcome into the envelope, logging failures.
fn settle(operation: &str, result: CoreResult<()>) -> Response<bool> {
    if let Err(e) = &result {
        warn!("{} failed: {}", operation, e);
    }
    Response::from_result(result.map(|()| true))
}
