use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::StoreError;
use crate::core::{EmissionContext, FiscalDocument, Transition};

/// Durable record of documents and their lifecycle.
///
/// Writes are transitions, never raw field updates; implementations apply
/// them with [`FiscalDocument::apply`] so the lifecycle invariants hold
/// whatever the backend.
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    /// Document, lines, referenced documents and issuer profile.
    async fn load_context(&self, document_id: &str) -> Result<EmissionContext, StoreError>;

    async fn load_document(&self, document_id: &str) -> Result<FiscalDocument, StoreError>;

    /// Apply a transition and return the updated document.
    async fn apply(
        &self,
        document_id: &str,
        transition: Transition,
    ) -> Result<FiscalDocument, StoreError>;
}

/// [`LifecycleStore`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    contexts: RwLock<HashMap<String, EmissionContext>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a context, keyed by its document id.
    pub async fn insert(&self, ctx: EmissionContext) {
        self.contexts
            .write()
            .await
            .insert(ctx.document.id.clone(), ctx);
    }

    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }
}

#[async_trait]
impl LifecycleStore for InMemoryStore {
    async fn load_context(&self, document_id: &str) -> Result<EmissionContext, StoreError> {
        self.contexts
            .read()
            .await
            .get(document_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))
    }

    async fn load_document(&self, document_id: &str) -> Result<FiscalDocument, StoreError> {
        self.contexts
            .read()
            .await
            .get(document_id)
            .map(|ctx| ctx.document.clone())
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))
    }

    async fn apply(
        &self,
        document_id: &str,
        transition: Transition,
    ) -> Result<FiscalDocument, StoreError> {
        let mut contexts = self.contexts.write().await;
        let ctx = contexts
            .get_mut(document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;

        // Apply to a copy so a refused transition leaves the record untouched
        let mut document = ctx.document.clone();
        document
            .apply(transition)
            .map_err(|source| StoreError::Refused {
                document_id: document_id.to_string(),
                source,
            })?;
        ctx.document = document.clone();
        Ok(document)
    }
}
