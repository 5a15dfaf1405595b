use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::adapters::elli_client::{ElliClient, ElliClientConfig};
use crate::adapters::elli_http::TransportInitError;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_SESSIONS: usize = 1000;
/// Upper bound for any entry lifetime, whatever the policy asks for.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store lock poisoned")]
    LockPoisoned,
    #[error("failed to create elli client: {0}")]
    Client(#[from] TransportInitError),
}

/// Token-keyed cache of authenticated clients shared by the HTTP handlers.
pub trait ClientSessionStore: Send + Sync {
    /// Returns the live client for `token`, or registers a new one that
    /// presents `token` as its bearer credential.
    fn client_for_token(&self, token: &str) -> Result<Arc<ElliClient>, SessionStoreError>;

    /// Stores a client that just logged in. `expires_in` shortens the entry's
    /// lifetime below the store default when the vendor token expires sooner.
    fn register(
        &self,
        token: &str,
        client: ElliClient,
        expires_in: Option<Duration>,
    ) -> Result<Arc<ElliClient>, SessionStoreError>;

    fn len(&self) -> Result<usize, SessionStoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStorePolicy {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for SessionStorePolicy {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            max_entries: DEFAULT_MAX_SESSIONS,
        }
    }
}

struct Entry {
    client: Arc<ElliClient>,
    inserted_at: Instant,
    expires_at: Instant,
}

pub struct InMemorySessionStore<Cl = SystemClock> {
    client_config: ElliClientConfig,
    policy: SessionStorePolicy,
    clock: Cl,
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemorySessionStore<SystemClock> {
    pub fn new(client_config: ElliClientConfig, policy: SessionStorePolicy) -> Self {
        Self::with_clock(client_config, policy, SystemClock)
    }
}

impl<Cl: Clock> InMemorySessionStore<Cl> {
    pub fn with_clock(
        client_config: ElliClientConfig,
        policy: SessionStorePolicy,
        clock: Cl,
    ) -> Self {
        Self {
            client_config,
            policy: SessionStorePolicy {
                ttl: policy.ttl.min(MAX_SESSION_TTL),
                max_entries: policy.max_entries.max(1),
            },
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock_entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, SessionStoreError> {
        self.entries
            .lock()
            .map_err(|_| SessionStoreError::LockPoisoned)
    }

    fn live_client(
        &self,
        entries: &mut HashMap<String, Entry>,
        token: &str,
    ) -> Option<Arc<ElliClient>> {
        let now = self.clock.now();
        if let Some(entry) = entries.get(token) {
            if entry.expires_at > now {
                return Some(Arc::clone(&entry.client));
            }
            entries.remove(token);
        }
        None
    }

    fn insert(
        &self,
        entries: &mut HashMap<String, Entry>,
        token: &str,
        client: Arc<ElliClient>,
        ttl: Duration,
    ) {
        let now = self.clock.now();
        let Some(expires_at) = now.checked_add(ttl.min(MAX_SESSION_TTL)) else {
            tracing::warn!("session lifetime out of range, client not cached");
            return;
        };
        entries.retain(|_, entry| entry.expires_at > now);

        while entries.len() >= self.policy.max_entries && !entries.contains_key(token) {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            entries.remove(&oldest);
            tracing::debug!("evicted oldest elli client session");
        }

        entries.insert(
            token.to_string(),
            Entry {
                client,
                inserted_at: now,
                expires_at,
            },
        );
    }
}

impl<Cl: Clock> ClientSessionStore for InMemorySessionStore<Cl> {
    fn client_for_token(&self, token: &str) -> Result<Arc<ElliClient>, SessionStoreError> {
        {
            let mut entries = self.lock_entries()?;
            if let Some(client) = self.live_client(&mut entries, token) {
                return Ok(client);
            }
        }

        // Built outside the lock; another caller may win the race for `token`.
        let client = Arc::new(ElliClient::with_access_token(&self.client_config, token)?);

        let mut entries = self.lock_entries()?;
        if let Some(existing) = self.live_client(&mut entries, token) {
            return Ok(existing);
        }
        self.insert(&mut entries, token, Arc::clone(&client), self.policy.ttl);
        tracing::debug!(sessions = entries.len(), "registered elli client for presented token");
        Ok(client)
    }

    fn register(
        &self,
        token: &str,
        client: ElliClient,
        expires_in: Option<Duration>,
    ) -> Result<Arc<ElliClient>, SessionStoreError> {
        let ttl = expires_in
            .map(|expires_in| expires_in.min(self.policy.ttl))
            .unwrap_or(self.policy.ttl);
        let client = Arc::new(client);

        let mut entries = self.lock_entries()?;
        self.insert(&mut entries, token, Arc::clone(&client), ttl);
        tracing::debug!(sessions = entries.len(), "registered elli client after login");
        Ok(client)
    }

    fn len(&self) -> Result<usize, SessionStoreError> {
        let now = self.clock.now();
        Ok(self
            .lock_entries()?
            .values()
            .filter(|entry| entry.expires_at > now)
            .count())
    }
}
