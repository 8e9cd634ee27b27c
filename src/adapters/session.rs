use std::sync::{Arc, PoisonError, RwLock};

use crate::ports::session::{Error, SessionPort};

/// Session held in memory, set and cleared by the host application
#[derive(Clone, Debug, Default)]
pub struct MemorySession {
    user_id: Arc<RwLock<Option<String>>>,
}

impl MemorySession {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Arc::new(RwLock::new(Some(user_id.into()))),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        self.set(Some(user_id.into()));
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    /// Replace the session even if a previous writer panicked
    fn set(&self, user_id: Option<String>) {
        let mut current = self.user_id.write().unwrap_or_else(PoisonError::into_inner);
        *current = user_id;
    }
}

#[async_trait::async_trait]
impl SessionPort for MemorySession {
    async fn current_user_id(&self) -> Result<String, Error> {
        let current = self
            .user_id
            .read()
            .map_err(|err| Error::Adapter(err.to_string().into()))?;

        current.clone().ok_or(Error::NotAuthenticated)
    }
}
