//! Process-wide session state: one store instance owns the single active
//! session, its persistence across reloads, and the expiry timer wired to it.
//!
//! Lifecycle errors never bubble to UI code as panics; they surface as a
//! transition to Absent plus a broadcast event. Tests build a fresh store
//! per case instead of sharing an ambient global.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::claims::{self, AccountStatus, Claims};
use crate::config::CoreConfig;
use crate::error::SessionError;
use crate::expiry::ExpiryScheduler;

use super::vault::{CredentialVault, FileVault, MemoryVault, StoredCredential};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Cleared when the client closes.
    Ephemeral,
    /// Survives restarts ("remember me").
    Durable,
}

/// The single active session. Replaced whole, never edited in place.
#[derive(Debug, Clone)]
pub struct Session {
    pub credential: String,
    pub claims: Claims,
    pub persistence: PersistenceMode,
}

/// Why a session ended. Carried on `SessionEvent::Ended` so the UI can pick
/// the right message; suspension is terminal and must never read as expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Expired,
    Suspended,
    BadCredential,
    LoggedOut,
}

/// Broadcast to subscribers on every state transition. `ExpiryWarning` is
/// non-terminal; the session stays authenticated after it.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { role_id: i64 },
    ExpiryWarning,
    Ended { reason: EndReason },
}

struct State {
    session: Option<Session>,
    // Bumped on every set/clear; an expiry callback carrying an older
    // generation is a stale timer and must not touch the current session.
    generation: u64,
}

pub struct SessionStore {
    state: Mutex<State>,
    scheduler: Mutex<ExpiryScheduler>,
    durable: Arc<dyn CredentialVault>,
    ephemeral: Arc<dyn CredentialVault>,
    events: broadcast::Sender<SessionEvent>,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SessionStore {
    pub fn new(
        durable: Arc<dyn CredentialVault>,
        ephemeral: Arc<dyn CredentialVault>,
        warning_threshold_ms: i64,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(State { session: None, generation: 0 }),
            scheduler: Mutex::new(ExpiryScheduler::new(warning_threshold_ms)),
            durable,
            ephemeral,
            events,
        })
    }

    /// Store backed by the default tiers: a JSON file for "remember me" and
    /// an in-memory slot for the rest.
    pub fn with_config(cfg: &CoreConfig) -> Arc<Self> {
        Self::new(
            Arc::new(FileVault::new(&cfg.vault_path)),
            Arc::new(MemoryVault::new()),
            cfg.warning_threshold.as_millis() as i64,
        )
    }

    /// Install a new session from a freshly issued credential.
    ///
    /// A credential that fails to decode, or decodes to a suspended account,
    /// leaves the store Absent and returns the reason. A credential that is
    /// already past its expiry is installed and immediately expired by the
    /// scheduler's synchronous path, ending Absent with no timer armed.
    pub fn set(
        self: &Arc<Self>,
        credential: &str,
        mode: PersistenceMode,
    ) -> Result<(), SessionError> {
        let decoded = match claims::decode(credential) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "credential rejected by decoder");
                self.end(EndReason::BadCredential);
                return Err(e.into());
            }
        };
        if decoded.account_status == AccountStatus::Suspended {
            info!(subject = %decoded.subject_id, "suspended account, session refused");
            self.end(EndReason::Suspended);
            return Err(SessionError::Suspended);
        }

        let now = now_ms();
        let generation = {
            let mut st = self.state.lock();
            st.generation += 1;
            st.session = Some(Session {
                credential: credential.to_string(),
                claims: decoded.clone(),
                persistence: mode,
            });
            st.generation
        };

        // The requested tier becomes authoritative; the other is dropped so
        // a later restore cannot resurrect a superseded credential.
        let stored = StoredCredential {
            token: credential.to_string(),
            expires_at: decoded.expires_at_ms(),
        };
        let (target, other) = match mode {
            PersistenceMode::Durable => (&self.durable, &self.ephemeral),
            PersistenceMode::Ephemeral => (&self.ephemeral, &self.durable),
        };
        if let Err(e) = target.store(&stored) {
            warn!(error = %e, "credential could not be persisted");
        }
        if let Err(e) = other.erase() {
            warn!(error = %e, "stale tier could not be erased");
        }

        info!(
            subject = %decoded.subject_id,
            role = decoded.role_id,
            expires_at = decoded.expires_at_epoch_secs,
            "session established"
        );
        let _ = self.events.send(SessionEvent::Started { role_id: decoded.role_id });

        let on_expire = {
            let store = Arc::downgrade(self);
            move || {
                if let Some(store) = store.upgrade() {
                    store.expire_if_current(generation);
                }
            }
        };
        let on_warning = {
            let store = Arc::downgrade(self);
            move || {
                if let Some(store) = store.upgrade() {
                    info!("session expiring soon");
                    let _ = store.events.send(SessionEvent::ExpiryWarning);
                }
            }
        };
        self.scheduler.lock().arm(
            decoded.expires_at_epoch_secs,
            now,
            generation,
            on_expire,
            on_warning,
        );
        Ok(())
    }

    /// Explicit logout: disarm, drop the session, erase both tiers.
    pub fn clear(&self) {
        self.end(EndReason::LoggedOut);
    }

    /// One-shot startup restore. The durable tier wins; a durable slot whose
    /// expiry marker is already past erases both tiers and stays Absent
    /// (no fallthrough to the ephemeral tier). Returns whether a session is
    /// authenticated afterwards.
    pub fn restore(self: &Arc<Self>) -> bool {
        match self.durable.load() {
            Ok(Some(stored)) => {
                if stored.expires_at <= now_ms() {
                    info!("stale remembered credential, dropping both tiers");
                    self.erase_tiers();
                    return false;
                }
                return self.set(&stored.token, PersistenceMode::Durable).is_ok();
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "durable tier unreadable, skipping"),
        }
        match self.ephemeral.load() {
            Ok(Some(stored)) => {
                self.set(&stored.token, PersistenceMode::Ephemeral).is_ok()
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "ephemeral tier unreadable, skipping");
                false
            }
        }
    }

    pub fn current_claims(&self) -> Option<Claims> {
        self.state.lock().session.as_ref().map(|s| s.claims.clone())
    }

    pub fn current_role_id(&self) -> Option<i64> {
        self.state.lock().session.as_ref().map(|s| s.claims.role_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().session.is_some()
    }

    pub fn persistence_mode(&self) -> Option<PersistenceMode> {
        self.state.lock().session.as_ref().map(|s| s.persistence)
    }

    /// The armed expiry instant (epoch millis), if a timer is live.
    pub fn armed_expiry_ms(&self) -> Option<i64> {
        self.scheduler.lock().armed_target_ms()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Expiry path, entered either synchronously from `arm` (already-past
    /// credential) or from the fired timer task. Does not touch the
    /// scheduler: in both cases there is no live timer left to cancel, and
    /// the synchronous case runs under the scheduler lock.
    fn expire_if_current(self: &Arc<Self>, generation: u64) {
        let ended = {
            let mut st = self.state.lock();
            if st.generation == generation && st.session.is_some() {
                st.session = None;
                true
            } else {
                false
            }
        };
        if !ended {
            return;
        }
        self.erase_tiers();
        info!("session expired");
        let _ = self.events.send(SessionEvent::Ended { reason: EndReason::Expired });
    }

    fn end(&self, reason: EndReason) {
        self.scheduler.lock().disarm();
        {
            let mut st = self.state.lock();
            st.generation += 1;
            st.session = None;
        }
        self.erase_tiers();
        info!(?reason, "session ended");
        let _ = self.events.send(SessionEvent::Ended { reason });
    }

    fn erase_tiers(&self) {
        if let Err(e) = self.durable.erase() {
            warn!(error = %e, "durable tier erase failed");
        }
        if let Err(e) = self.ephemeral.erase() {
            warn!(error = %e, "ephemeral tier erase failed");
        }
    }
}
