//! In-process draft store.
//!
//! Used when no database URL is configured and by the behaviour tests. It
//! mirrors the PostgreSQL adapter's observable rules: the floating-draft
//! uniqueness guard, most-recent-first lookups, and (optionally) a stuck id
//! sequence that hands out 0.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{DraftRepository, DraftRepositoryError};
use crate::domain::{Draft, DraftId, DraftOwner, NewDraft, ReportId};

#[derive(Debug)]
struct Store {
    rows: BTreeMap<i64, Draft>,
    next_id: i64,
    stuck_sequence: bool,
}

/// Draft repository holding rows in memory.
#[derive(Debug)]
pub struct InMemoryDraftRepository {
    store: Mutex<Store>,
}

impl Default for InMemoryDraftRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn most_recent<'a>(candidates: impl Iterator<Item = &'a Draft>) -> Option<Draft> {
    candidates
        .max_by_key(|draft| (draft.last_updated(), draft.id()))
        .cloned()
}

fn floating_slot(owner: &DraftOwner) -> (&str, i64) {
    (
        owner.session_token().as_ref(),
        owner.user_id().map_or(0, |user| user.get()),
    )
}

/// Whether another floating row already holds `owner`'s slot.
fn floating_slot_taken(store: &Store, owner: &DraftOwner, except: Option<DraftId>) -> bool {
    let slot = floating_slot(owner);
    store.rows.values().any(|row| {
        Some(row.id()) != except
            && row.report_id().is_none()
            && floating_slot(row.owner()) == slot
    })
}

impl InMemoryDraftRepository {
    /// Empty store whose id sequence starts at 1.
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store {
                rows: BTreeMap::new(),
                next_id: 1,
                stuck_sequence: false,
            }),
        }
    }

    /// Empty store whose sequence always hands out id 0, like a table whose
    /// autoincrement was never configured.
    pub fn with_stuck_sequence() -> Self {
        let repo = Self::new();
        if let Ok(mut store) = repo.store.lock() {
            store.stuck_sequence = true;
        }
        repo
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, DraftRepositoryError> {
        self.store
            .lock()
            .map_err(|_| DraftRepositoryError::query("draft store lock poisoned"))
    }

    /// Store `draft` as-is, replacing any row with the same id.
    pub fn seed(&self, draft: Draft) -> Result<(), DraftRepositoryError> {
        let mut store = self.lock()?;
        let id = draft.id().get();
        store.next_id = store.next_id.max(id.saturating_add(1));
        store.rows.insert(id, draft);
        Ok(())
    }

    /// Every stored draft, ordered by id.
    pub fn drafts(&self) -> Result<Vec<Draft>, DraftRepositoryError> {
        Ok(self.lock()?.rows.values().cloned().collect())
    }
}

#[async_trait]
impl DraftRepository for InMemoryDraftRepository {
    async fn find_attached(
        &self,
        report_id: ReportId,
    ) -> Result<Option<Draft>, DraftRepositoryError> {
        let store = self.lock()?;
        Ok(most_recent(
            store
                .rows
                .values()
                .filter(|draft| draft.report_id() == Some(report_id)),
        ))
    }

    async fn find_floating(
        &self,
        owner: &DraftOwner,
    ) -> Result<Option<Draft>, DraftRepositoryError> {
        let store = self.lock()?;
        // The caller's own row wins over an anonymous row it could claim.
        Ok(store
            .rows
            .values()
            .filter(|draft| {
                let stored = draft.owner();
                draft.report_id().is_none()
                    && stored.session_token() == owner.session_token()
                    && match owner.user_id() {
                        Some(user) => stored.user_id().is_none_or(|existing| existing == user),
                        None => stored.user_id().is_none(),
                    }
            })
            .max_by_key(|draft| {
                (
                    draft.owner().user_id().is_some(),
                    draft.last_updated(),
                    draft.id(),
                )
            })
            .cloned())
    }

    async fn insert(
        &self,
        draft: &NewDraft,
        explicit_id: Option<DraftId>,
    ) -> Result<Draft, DraftRepositoryError> {
        let mut store = self.lock()?;

        if draft.report_id().is_none() && floating_slot_taken(&store, draft.owner(), None) {
            return Err(DraftRepositoryError::duplicate_floating());
        }

        let id = match explicit_id {
            Some(id) => id.get(),
            None if store.stuck_sequence => 0,
            None => {
                let id = store.next_id;
                store.next_id += 1;
                id
            }
        };
        if store.rows.contains_key(&id) {
            return Err(if explicit_id.is_none() && id == 0 {
                DraftRepositoryError::zero_key_collision()
            } else {
                DraftRepositoryError::query(format!("duplicate draft id {id}"))
            });
        }

        let stored = draft.clone().into_draft(DraftId::new(id));
        store.next_id = store.next_id.max(id.saturating_add(1));
        store.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn next_free_id(&self) -> Result<DraftId, DraftRepositoryError> {
        let store = self.lock()?;
        let max = store.rows.keys().next_back().copied().unwrap_or(0);
        Ok(DraftId::new(max).next())
    }

    async fn update(&self, draft: &Draft) -> Result<(), DraftRepositoryError> {
        let mut store = self.lock()?;
        if draft.report_id().is_none()
            && floating_slot_taken(&store, draft.owner(), Some(draft.id()))
        {
            return Err(DraftRepositoryError::duplicate_floating());
        }
        match store.rows.get_mut(&draft.id().get()) {
            Some(row) => {
                *row = draft.clone();
                Ok(())
            }
            None => Err(DraftRepositoryError::query(format!(
                "draft {} no longer exists",
                draft.id()
            ))),
        }
    }
}
