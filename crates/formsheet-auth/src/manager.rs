//! The single entry point for obtaining an authenticated transport.
//!
//! For each request the manager loads the identity's credential, acquires
//! one if none exists, refreshes it if it is stale, persists whatever
//! changed and wraps the access token in an [`AuthenticatedTransport`].
//!
//! All of that runs under a per-identity lock, so concurrent callers for one
//! identity trigger at most one acquisition or refresh between them, while
//! callers for different identities never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use formsheet_core::{Clock, SystemClock};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use crate::acquire::{Acquirer, AuthCodeSource, ConsoleCodeSource};
use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::oauth::OAuthClient;
use crate::refresh::Refresher;
use crate::store::{MemoryTokenStore, TokenStore};
use crate::transport::AuthenticatedTransport;

/// Default timeout for every token endpoint exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default head start taken on expiry.
pub const DEFAULT_EXPIRY_MARGIN_SECS: i64 = 60;

/// Largest accepted expiry margin.
pub const MAX_EXPIRY_MARGIN_SECS: i64 = 24 * 60 * 60;

/// Last credential seen for one identity, guarded by that identity's lock.
type Slot = Arc<TokioMutex<Option<Credential>>>;

/// State of an identity's credential, without contacting any server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Never acquired.
    Missing,
    /// Usable as is.
    Fresh {
        /// When the access token expires.
        expiry: chrono::DateTime<chrono::Utc>,
    },
    /// Needs a refresh before use.
    Stale {
        /// When the access token expired or will expire.
        expiry: chrono::DateTime<chrono::Utc>,
    },
}

/// Hands out authenticated transports, keeping credentials fresh.
#[derive(Debug)]
pub struct CredentialManager {
    store: Arc<dyn TokenStore>,
    acquirer: Acquirer,
    refresher: Refresher,
    http_client: reqwest::Client,
    clock: Arc<dyn Clock>,
    expiry_margin: chrono::Duration,
    slots: Mutex<HashMap<Identity, Slot>>,
}

/// Builder for [`CredentialManager`].
#[derive(Debug)]
pub struct CredentialManagerBuilder {
    store: Option<Arc<dyn TokenStore>>,
    code_source: Option<Arc<dyn AuthCodeSource>>,
    clock: Option<Arc<dyn Clock>>,
    timeout: Duration,
    expiry_margin: chrono::Duration,
}

impl Default for CredentialManagerBuilder {
    fn default() -> Self {
        Self {
            store: None,
            code_source: None,
            clock: None,
            timeout: DEFAULT_TIMEOUT,
            expiry_margin: chrono::Duration::seconds(DEFAULT_EXPIRY_MARGIN_SECS),
        }
    }
}

impl CredentialManagerBuilder {
    /// Persists credentials in `store`. Defaults to an in-memory store.
    pub fn store(self, store: impl TokenStore + 'static) -> Self {
        self.shared_store(Arc::new(store))
    }

    /// Persists credentials in a store shared with other components.
    pub fn shared_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Obtains authorization codes from `source`. Defaults to the console.
    pub fn code_source(mut self, source: impl AuthCodeSource + 'static) -> Self {
        self.code_source = Some(Arc::new(source));
        self
    }

    /// Reads time from `clock`. Defaults to the system clock.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Timeout for each token endpoint exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Treats credentials expiring within `margin` as stale.
    ///
    /// Must lie between zero and [`MAX_EXPIRY_MARGIN_SECS`]; [`build`]
    /// rejects anything else.
    ///
    /// [`build`]: Self::build
    pub fn expiry_margin(mut self, margin: chrono::Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Builds the manager.
    pub fn build(self) -> Result<CredentialManager> {
        if self.expiry_margin < chrono::Duration::zero()
            || self.expiry_margin > chrono::Duration::seconds(MAX_EXPIRY_MARGIN_SECS)
        {
            return Err(Error::config(format!(
                "expiry margin must be between 0 and {} seconds, got {}",
                MAX_EXPIRY_MARGIN_SECS,
                self.expiry_margin.num_seconds()
            )));
        }

        let oauth = OAuthClient::new(self.timeout)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let code_source = self
            .code_source
            .unwrap_or_else(|| Arc::new(ConsoleCodeSource::new()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));

        Ok(CredentialManager {
            store,
            acquirer: Acquirer::new(oauth.clone(), code_source, clock.clone()),
            refresher: Refresher::new(oauth.clone(), clock.clone()),
            http_client: oauth.http_client().clone(),
            clock,
            expiry_margin: self.expiry_margin,
            slots: Mutex::new(HashMap::new()),
        })
    }
}

impl CredentialManager {
    /// Starts building a manager.
    pub fn builder() -> CredentialManagerBuilder {
        CredentialManagerBuilder::default()
    }

    /// Returns a transport carrying a credential that is fresh right now.
    ///
    /// Acquires the credential interactively the first time an identity is
    /// used and refreshes it once it goes stale. A store read failure counts
    /// as "never acquired"; a store write failure is logged and the new
    /// credential is still used.
    pub async fn get_transport(
        &self,
        identity: &Identity,
        config: &ClientConfig,
    ) -> Result<AuthenticatedTransport> {
        identity.validate()?;
        let slot = self.slot(identity);
        let mut cached = slot.lock().await;

        if let Some(credential) = cached.as_ref()
            && credential.is_fresh_at(self.clock.now(), self.expiry_margin)
        {
            debug!(%identity, "using cached credential");
            return AuthenticatedTransport::new(self.http_client.clone(), credential);
        }

        let credential = match self.current(identity, cached.as_ref()) {
            None => {
                info!(%identity, "no stored credential, starting authorization");
                let credential = self.acquirer.acquire(config).await?;
                self.persist(identity, &credential);
                credential
            }
            Some(credential) if credential.is_stale_at(self.clock.now(), self.expiry_margin) => {
                info!(%identity, expiry = %credential.expiry, "credential is stale");
                let credential = self.refresher.refresh(config, &credential).await?;
                self.persist(identity, &credential);
                credential
            }
            Some(credential) => credential,
        };

        let transport = AuthenticatedTransport::new(self.http_client.clone(), &credential)?;
        *cached = Some(credential);
        Ok(transport)
    }

    /// Refreshes the identity's credential regardless of its expiry.
    ///
    /// Acquires one if the identity has none.
    pub async fn force_refresh(
        &self,
        identity: &Identity,
        config: &ClientConfig,
    ) -> Result<AuthenticatedTransport> {
        self.renew(identity, config, None).await
    }

    /// Renews the credential after a downstream API rejected `rejected`.
    ///
    /// If another caller already replaced the rejected token, the current
    /// credential is returned without contacting the token endpoint.
    pub async fn refresh_rejected(
        &self,
        identity: &Identity,
        config: &ClientConfig,
        rejected: &AuthenticatedTransport,
    ) -> Result<AuthenticatedTransport> {
        self.renew(identity, config, Some(rejected)).await
    }

    /// Reports the identity's credential state from cache or store.
    pub async fn status(&self, identity: &Identity) -> Result<CredentialStatus> {
        identity.validate()?;
        let slot = self.slot(identity);
        let cached = slot.lock().await;

        let credential = match self.store.load(identity)? {
            Some(credential) => Some(credential),
            None => cached.clone(),
        };

        Ok(match credential {
            None => CredentialStatus::Missing,
            Some(c) if c.is_fresh_at(self.clock.now(), self.expiry_margin) => {
                CredentialStatus::Fresh { expiry: c.expiry }
            }
            Some(c) => CredentialStatus::Stale { expiry: c.expiry },
        })
    }

    async fn renew(
        &self,
        identity: &Identity,
        config: &ClientConfig,
        rejected: Option<&AuthenticatedTransport>,
    ) -> Result<AuthenticatedTransport> {
        identity.validate()?;
        let slot = self.slot(identity);
        let mut cached = slot.lock().await;

        let credential = match self.current(identity, cached.as_ref()) {
            None => {
                info!(%identity, "no stored credential, starting authorization");
                let credential = self.acquirer.acquire(config).await?;
                self.persist(identity, &credential);
                credential
            }
            Some(credential)
                if rejected.is_some_and(|t| !t.carries(&credential))
                    && credential.is_fresh_at(self.clock.now(), self.expiry_margin) =>
            {
                debug!(%identity, "rejected token was already replaced");
                credential
            }
            Some(credential) => {
                warn!(%identity, "renewing credential ahead of expiry");
                let credential = self.refresher.refresh(config, &credential).await?;
                self.persist(identity, &credential);
                credential
            }
        };

        let transport = AuthenticatedTransport::new(self.http_client.clone(), &credential)?;
        *cached = Some(credential);
        Ok(transport)
    }

    /// The newest credential known for `identity`: the store's record, or the
    /// cached one when the store has none or cannot be read.
    fn current(&self, identity: &Identity, cached: Option<&Credential>) -> Option<Credential> {
        match self.store.load(identity) {
            Ok(Some(credential)) => Some(credential),
            Ok(None) => cached.cloned(),
            Err(e) => {
                warn!(%identity, error = %e, "failed to load stored credential");
                cached.cloned()
            }
        }
    }

    fn persist(&self, identity: &Identity, credential: &Credential) {
        if let Err(e) = self.store.save(identity, credential) {
            warn!(
                %identity,
                error = %e,
                "failed to persist credential, using it for this call only"
            );
        }
    }

    fn slot(&self, identity: &Identity) -> Slot {
        // The map only ever gains entries, so a poisoned lock is still sound.
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(identity.clone()).or_default().clone()
    }
}
