use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use tokio::sync::broadcast;

use crate::error::{DashboardError, Result};

const EVENT_CAPACITY: usize = 16;

/// Personal access token used as the Basic auth password.
///
/// `Debug` never prints the secret itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.len())
    }
}

/// Lifecycle events published by [`CredentialStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEvent {
    Cleared,
}

/// In-memory holder for the single live credential.
///
/// Created once at startup and shared as `Arc<CredentialStore>`. The lock only
/// guards the slot itself and is released before any I/O happens.
pub struct CredentialStore {
    slot: Mutex<Option<Token>>,
    events: broadcast::Sender<CredentialEvent>,
}

impl CredentialStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slot: Mutex::new(None),
            events,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Token>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current secret, or an empty string when none is set.
    pub fn get(&self) -> String {
        self.current()
            .map(|token| token.as_str().to_owned())
            .unwrap_or_default()
    }

    pub fn current(&self) -> Option<Token> {
        let token = self.slot().clone();
        debug!(
            "Credential requested, {}",
            token
                .as_ref()
                .map_or_else(|| "none set".to_string(), |t| format!("{t:?}"))
        );
        token
    }

    /// Replaces the stored secret.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `secret` is empty.
    pub fn set(&self, secret: impl Into<Token>) -> Result<()> {
        let token = secret.into();
        if token.as_str().is_empty() {
            return Err(DashboardError::InvalidInput(
                "credential cannot be empty".into(),
            ));
        }

        info!("Storing credential ({} chars)", token.as_str().len());
        *self.slot() = Some(token);
        Ok(())
    }

    /// Drops the stored secret and notifies every subscriber.
    pub fn clear(&self) {
        self.slot().take();
        info!("Credential cleared");

        // No subscribers is fine.
        let _ = self.events.send(CredentialEvent::Cleared);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CredentialEvent> {
        self.events.subscribe()
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
