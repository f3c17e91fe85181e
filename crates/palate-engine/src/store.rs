//! Interfaces to the hosting layer.
//!
//! The engine itself never performs I/O. Catalog snapshots come in through a
//! [`CatalogProvider`], and callers persist sessions after each engine call
//! through a [`SessionStore`]. Stores must serialize mutating calls for one
//! session; the engine assumes at most one in flight.

use std::{collections::HashMap, convert::Infallible};

use palate_model::{CatalogItem, Category};

use crate::{Session, SessionId};

/// Source of catalog snapshots.
pub trait CatalogProvider {
    type Error;

    /// Every item of `category` currently available.
    fn snapshot(&self, category: Category) -> Result<Vec<CatalogItem>, Self::Error>;
}

/// Catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: Vec<CatalogItem>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

impl CatalogProvider for StaticCatalog {
    type Error = Infallible;

    fn snapshot(&self, category: Category) -> Result<Vec<CatalogItem>, Self::Error> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.category == category)
            .cloned()
            .collect())
    }
}

/// Persistence of sessions between engine calls.
pub trait SessionStore {
    type Error;

    fn load(&self, id: &SessionId) -> Result<Option<Session>, Self::Error>;
    fn save(&mut self, session: &Session) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: HashMap<SessionId, Session>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Stored sessions, in no particular order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> + '_ {
        self.sessions.values()
    }
}

impl SessionStore for MemorySessionStore {
    type Error = Infallible;

    fn load(&self, id: &SessionId) -> Result<Option<Session>, Self::Error> {
        Ok(self.sessions.get(id).cloned())
    }

    fn save(&mut self, session: &Session) -> Result<(), Self::Error> {
        self.sessions.insert(session.id().clone(), session.clone());
        Ok(())
    }
}
