//! Conversation service wiring merge, ordering, favorites and cascade delete.
//!
//! Holds no cached list: every read merges both stores again, so a delete or
//! a rank change is visible on the next `list` call.

use crate::cascade::{
    CascadeDeleteEngine, DeletionFailure, DeletionPlan, DeletionSet, RelatedContent,
    RollbackReport,
};
use crate::error::{Error, Result};
use crate::identity::same_entity;
use crate::merge::merge;
use crate::models::{Conversation, ConversationId};
use crate::ranking::{self, RankValidation};
use crate::sort::{sort_conversations, SortOptions};
use crate::store::{ConversationStore, PollStore};

/// Service over a remote store, a local cache and a poll store.
pub struct ConversationService<R, L, P> {
    engine: CascadeDeleteEngine<R, L, P>,
}

impl<R, L, P> ConversationService<R, L, P>
where
    R: ConversationStore,
    L: ConversationStore,
    P: PollStore,
{
    pub const fn new(remote: R, local: L, polls: P) -> Self {
        Self {
            engine: CascadeDeleteEngine::new(remote, local, polls),
        }
    }

    /// The cascade delete engine (and through it, the stores).
    pub const fn engine(&self) -> &CascadeDeleteEngine<R, L, P> {
        &self.engine
    }

    /// Merged, unordered conversations of `owner_id`.
    ///
    /// When the remote store is unreachable the local cache is shown alone.
    pub async fn merged(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let remote = match self.engine.remote().list_conversations(owner_id).await {
            Ok(conversations) => conversations,
            Err(error) => {
                tracing::warn!(%error, "Remote store unavailable; showing local cache only");
                Vec::new()
            }
        };
        let local = self.engine.local().list_conversations(owner_id).await?;
        Ok(merge(&remote, &local, owner_id))
    }

    /// Merged conversations of `owner_id` in display order.
    pub async fn list(&self, owner_id: &str, options: &SortOptions) -> Result<Vec<Conversation>> {
        let mut conversations = self.merged(owner_id).await?;
        sort_conversations(&mut conversations, options);
        Ok(conversations)
    }

    /// Favorite or unfavorite a conversation.
    pub async fn set_favorite(
        &self,
        owner_id: &str,
        id: &ConversationId,
        favorite: bool,
    ) -> Result<Conversation> {
        let conversations = self.merged(owner_id).await?;
        let target = find(&conversations, id)?;
        let patch = ranking::set_favorite(&conversations, target, favorite);

        tracing::debug!(conversation_id = %id, favorite, rank = ?patch.favorite_rank, "Setting favorite");
        self.write_through(owner_id, target, |conversation| patch.apply(conversation))
            .await
    }

    /// Move one favorite to `rank` without renumbering the others.
    pub async fn reorder(
        &self,
        owner_id: &str,
        id: &ConversationId,
        rank: u32,
    ) -> Result<Conversation> {
        let conversations = self.merged(owner_id).await?;
        let reordered = ranking::reorder(&conversations, id, rank)?;
        let target = find(&reordered, id)?;
        let new_rank = target.favorite_rank;

        self.write_through(owner_id, target, |conversation| {
            set_rank(conversation, new_rank);
        })
        .await
    }

    /// Renumber favorites densely as 1..N and persist the changes.
    ///
    /// Returns how many conversations changed.
    pub async fn normalize_ranks(&self, owner_id: &str) -> Result<usize> {
        let conversations = self.merged(owner_id).await?;
        let normalized = ranking::normalize(&conversations);

        let mut changed = 0;
        for (before, after) in conversations.iter().zip(&normalized) {
            if before.favorite_rank == after.favorite_rank {
                continue;
            }
            let rank = after.favorite_rank;
            self.write_through(owner_id, after, |conversation| {
                set_rank(conversation, rank);
            })
            .await?;
            changed += 1;
        }

        tracing::info!(owner_id, changed, "Normalized favorite ranks");
        Ok(changed)
    }

    /// Report rank-sequence problems of `owner_id`'s favorites.
    pub async fn validate_ranks(&self, owner_id: &str) -> Result<RankValidation> {
        let conversations = self.merged(owner_id).await?;
        Ok(ranking::validate(&conversations))
    }

    /// Dry run of [`Self::delete`].
    pub async fn preview_delete(&self, id: &ConversationId) -> Result<DeletionPlan> {
        self.engine.prepare(id).await
    }

    /// Delete a conversation with its messages and poll.
    pub async fn delete(
        &self,
        id: &ConversationId,
    ) -> std::result::Result<DeletionSet, DeletionFailure> {
        self.engine.execute(id).await
    }

    /// Undo whatever a failed delete removed.
    ///
    /// Returns `None` when the failure happened before anything was mutated.
    pub async fn rollback(&self, failure: DeletionFailure) -> Result<Option<RollbackReport>> {
        match failure.rollback {
            Some(rollback) => rollback.restore(&self.engine).await.map(Some),
            None => Ok(None),
        }
    }

    /// Whether a conversation has messages and/or a poll.
    pub async fn has_related_content(&self, id: &ConversationId) -> RelatedContent {
        self.engine.has_related_content(id).await
    }

    /// Apply `change` to every stored copy of `target` and return the canonical one.
    ///
    /// The remote record is updated when it exists; local aliases are kept in
    /// step so the cache agrees when the remote store is unreachable. A remote
    /// failure is logged and the local copy becomes canonical; the remote
    /// error is returned only when no local copy could be written either.
    async fn write_through<F>(
        &self,
        owner_id: &str,
        target: &Conversation,
        change: F,
    ) -> Result<Conversation>
    where
        F: Fn(&mut Conversation),
    {
        let (mut canonical, remote_error) = match self.write_remote(target, &change).await {
            Ok(updated) => (updated, None),
            Err(error) => {
                tracing::warn!(
                    conversation_id = %target.id,
                    %error,
                    "Remote store unavailable; writing local cache only"
                );
                (None, Some(error))
            }
        };

        for mut local in self.engine.local().list_conversations(owner_id).await? {
            if !same_entity(target, &local) {
                continue;
            }
            change(&mut local);
            let updated = self.engine.local().update_conversation(&local).await?;
            canonical.get_or_insert(updated);
        }

        match (canonical, remote_error) {
            (Some(conversation), _) => Ok(conversation),
            (None, Some(error)) => Err(error),
            (None, None) => Err(Error::NotFound(target.id.to_string())),
        }
    }

    async fn write_remote<F>(
        &self,
        target: &Conversation,
        change: &F,
    ) -> Result<Option<Conversation>>
    where
        F: Fn(&mut Conversation),
    {
        let Some(mut remote) = self.engine.remote().get_conversation(&target.id).await? else {
            return Ok(None);
        };
        change(&mut remote);
        self.engine.remote().update_conversation(&remote).await.map(Some)
    }
}

fn find<'a>(conversations: &'a [Conversation], id: &ConversationId) -> Result<&'a Conversation> {
    conversations
        .iter()
        .find(|conversation| &conversation.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))
}

fn set_rank(conversation: &mut Conversation, rank: Option<u32>) {
    if conversation.favorite_rank != rank {
        conversation.favorite_rank = rank;
        conversation.touch();
    }
}
