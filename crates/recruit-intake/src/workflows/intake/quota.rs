use std::sync::Arc;

use serde::Serialize;

use super::collaborators::{CandidateStore, StoreError};

/// Accepted submissions allowed per email, qualified and rejected alike.
pub const SUBMISSION_LIMIT: u32 = 3;

/// Caps total submissions per candidate email against the durable store.
///
/// The quota check and the eventual record insert are deliberately not
/// atomic; two concurrent submissions for the same email can both pass the
/// check. The sequential contract is what this component guarantees.
pub struct QuotaGuard<C> {
    store: Arc<C>,
    limit: u32,
}

impl<C> Clone for QuotaGuard<C> {
    fn clone(&self) -> Self {
        QuotaGuard {
            store: self.store.clone(),
            limit: self.limit,
        }
    }
}

impl<C: CandidateStore> QuotaGuard<C> {
    pub fn new(store: Arc<C>) -> Self {
        QuotaGuard {
            store,
            limit: SUBMISSION_LIMIT,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub async fn count(&self, email: &str) -> Result<u32, StoreError> {
        self.store.count_for_email(email).await
    }

    pub async fn remaining(&self, email: &str) -> Result<u32, StoreError> {
        Ok(self.limit.saturating_sub(self.count(email).await?))
    }

    pub async fn can_submit(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.remaining(email).await? > 0)
    }

    /// Snapshot for the read-only duplicate-check endpoint.
    pub async fn view(&self, email: &str) -> Result<QuotaView, StoreError> {
        let count = self.count(email).await?;
        let remaining = self.limit.saturating_sub(count);
        Ok(QuotaView {
            can_submit: remaining > 0,
            count,
            limit: self.limit,
            remaining,
        })
    }
}

/// Public quota snapshot, serialized with the API's camelCase field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaView {
    pub can_submit: bool,
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
}
