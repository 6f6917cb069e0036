//! The session repository: where session snapshots are stored.
//!
//! The engine always writes a whole session. There are no partial
//! updates, so retrying a failed write can never apply anything twice.

use std::collections::HashMap;
use std::sync::Arc;

use emberfall_combat::CombatSession;
use emberfall_protocol::{Codec, JsonCodec, SessionId};
use tokio::sync::Mutex;

use crate::RepositoryError;

/// Stores full session snapshots.
///
/// `Send + Sync + 'static` because one repository is shared by every
/// session actor.
///
/// # Example
///
/// ```rust
/// use emberfall_combat::CombatSession;
/// use emberfall_engine::{RepositoryError, SessionRepository};
/// use emberfall_protocol::SessionId;
///
/// /// Remembers nothing.
/// struct Forgetful;
///
/// impl SessionRepository for Forgetful {
///     async fn create(&self, _session: &CombatSession) -> Result<(), RepositoryError> {
///         Ok(())
///     }
///
///     async fn find_by_id(&self, _id: SessionId) -> Result<Option<CombatSession>, RepositoryError> {
///         Ok(None)
///     }
///
///     async fn update(&self, _session: &CombatSession) -> Result<bool, RepositoryError> {
///         Ok(false)
///     }
/// }
/// ```
pub trait SessionRepository: Send + Sync + 'static {
    /// Stores a session that is not stored yet.
    fn create(
        &self,
        session: &CombatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn find_by_id(
        &self,
        id: SessionId,
    ) -> impl std::future::Future<Output = Result<Option<CombatSession>, RepositoryError>> + Send;

    /// Replaces a stored session. Returns `false` if it was not stored.
    fn update(
        &self,
        session: &CombatSession,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}

impl<R: SessionRepository> SessionRepository for Arc<R> {
    async fn create(&self, session: &CombatSession) -> Result<(), RepositoryError> {
        (**self).create(session).await
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<CombatSession>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn update(&self, session: &CombatSession) -> Result<bool, RepositoryError> {
        (**self).update(session).await
    }
}

/// Keeps encoded snapshots in a map. Sessions survive as long as the
/// repository does.
pub struct InMemorySessionRepository<C: Codec = JsonCodec> {
    codec: C,
    snapshots: Mutex<HashMap<SessionId, Vec<u8>>>,
}

impl InMemorySessionRepository<JsonCodec> {
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for InMemorySessionRepository<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> InMemorySessionRepository<C> {
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.snapshots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.lock().await.is_empty()
    }
}

impl<C: Codec> SessionRepository for InMemorySessionRepository<C> {
    async fn create(&self, session: &CombatSession) -> Result<(), RepositoryError> {
        let bytes = self.codec.encode(session)?;
        let mut snapshots = self.snapshots.lock().await;
        if snapshots.contains_key(&session.id) {
            return Err(RepositoryError::AlreadyExists(session.id));
        }
        snapshots.insert(session.id, bytes);
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<CombatSession>, RepositoryError> {
        let snapshots = self.snapshots.lock().await;
        match snapshots.get(&id) {
            Some(bytes) => Ok(Some(self.codec.decode(bytes)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, session: &CombatSession) -> Result<bool, RepositoryError> {
        let bytes = self.codec.encode(session)?;
        let mut snapshots = self.snapshots.lock().await;
        match snapshots.get_mut(&session.id) {
            Some(slot) => {
                *slot = bytes;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use emberfall_protocol::LocationId;

    use super::*;

    #[tokio::test]
    async fn test_create_find_update() {
        let repo = InMemorySessionRepository::new();
        let mut session = CombatSession::new(SessionId(1), LocationId(2));

        assert!(!repo.update(&session).await.unwrap());
        repo.create(&session).await.unwrap();
        assert!(matches!(
            repo.create(&session).await,
            Err(RepositoryError::AlreadyExists(_))
        ));

        session.current_round = 4;
        assert!(repo.update(&session).await.unwrap());
        let stored = repo.find_by_id(SessionId(1)).await.unwrap().unwrap();
        assert_eq!(stored.current_round, 4);
        assert!(repo.find_by_id(SessionId(9)).await.unwrap().is_none());
        assert_eq!(repo.len().await, 1);
    }
}
