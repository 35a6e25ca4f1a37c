//! Ownership Validation
//! Mission: No note may point at a folder or tag that belongs to someone else

use crate::error::ApiError;
use crate::notes::models::Collection;
use crate::notes::store::NoteStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// References that failed the ownership check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipError {
    pub folder: Option<String>,
    pub tags: Vec<String>,
}

impl OwnershipError {
    fn merge(self, other: OwnershipError) -> OwnershipError {
        OwnershipError {
            folder: self.folder.or(other.folder),
            tags: self.tags.into_iter().chain(other.tags).collect(),
        }
    }
}

impl std::fmt::Display for OwnershipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(folder) = &self.folder {
            parts.push(format!(
                "This `folder` does not belong to the current `user`: {folder}"
            ));
        }
        if !self.tags.is_empty() {
            parts.push(format!(
                "The `tag(s)` with these `id(s)` do not belong to the current user: {}",
                self.tags.join(", ")
            ));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for OwnershipError {}

pub struct OwnershipValidator {
    store: Arc<dyn NoteStore>,
}

impl OwnershipValidator {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// An absent or empty folder id is always fine
    pub async fn validate_folder(
        &self,
        user_id: &str,
        folder_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let Some(folder_id) = folder_id.filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        match self
            .store
            .find_owned_by_id(Collection::Folders, folder_id, user_id)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(ApiError::Ownership(OwnershipError {
                folder: Some(folder_id.to_string()),
                tags: Vec::new(),
            })),
        }
    }

    /// Fails naming every requested tag the user does not own
    pub async fn validate_tags(&self, user_id: &str, tag_ids: &[String]) -> Result<(), ApiError> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let owned = self
            .store
            .find_owned_by_ids(Collection::Tags, tag_ids, user_id)
            .await?;
        if owned.len() == tag_ids.len() {
            return Ok(());
        }

        let owned: HashSet<&str> = owned.iter().map(|r| r.id.as_str()).collect();
        let foreign: Vec<String> = tag_ids
            .iter()
            .filter(|id| !owned.contains(id.as_str()))
            .cloned()
            .collect();
        if foreign.is_empty() {
            // repeated ids in the request, all of them owned
            return Ok(());
        }

        Err(ApiError::Ownership(OwnershipError {
            folder: None,
            tags: foreign,
        }))
    }

    /// Run both checks concurrently and wait for both. If either fails the
    /// error names every offending reference from both checks.
    pub async fn validate(
        &self,
        user_id: &str,
        folder_id: Option<&str>,
        tag_ids: &[String],
    ) -> Result<(), ApiError> {
        let (folder, tags) = tokio::join!(
            self.validate_folder(user_id, folder_id),
            self.validate_tags(user_id, tag_ids)
        );

        let result = match (folder, tags) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(ApiError::Ownership(a)), Err(ApiError::Ownership(b))) => {
                Err(ApiError::Ownership(a.merge(b)))
            }
            // a store failure outranks an ownership failure
            (Err(e @ ApiError::Internal(_)), _) | (_, Err(e @ ApiError::Internal(_))) => Err(e),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        if let Err(ApiError::Ownership(err)) = &result {
            warn!(user_id = %user_id, reason = %err, "Rejected foreign reference");
        }
        result
    }
}
