//! Cascade delete of a conversation, its messages and its linked poll
//!
//! A request moves through `Planned -> Executing -> Committed | Failed`.
//! The plan doubles as the in-memory backup: it holds every record the
//! deletion unit touches. Steps run strictly one after another (messages,
//! then conversations, then the poll), so a failure at step k means steps
//! before k completed and nothing after k ran. A failure hands back a
//! [`Rollback`] that reinserts what was removed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::same_entity;
use crate::models::{Conversation, ConversationId, Message, MessageId, Poll, PollId};
use crate::store::{ConversationStore, PollStore};

/// Which conversation store a step touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Remote,
    Local,
}

impl StoreKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

/// Lifecycle of one deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeletionState {
    Planned,
    Executing,
    Committed,
    Failed { rollback_available: bool },
}

/// Ids removed (or to be removed) by one deletion unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSet {
    pub conversations: Vec<ConversationId>,
    pub messages: Vec<MessageId>,
    pub polls: Vec<PollId>,
}

/// One conversation record in one store, with the messages it owns there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionTarget {
    pub source: StoreKind,
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// A single mutation of the deletion unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum DeletionStep {
    Messages {
        source: StoreKind,
        conversation_id: ConversationId,
    },
    Conversation {
        source: StoreKind,
        conversation_id: ConversationId,
    },
    Poll {
        poll_id: PollId,
    },
}

/// Everything a deletion will remove, captured before any mutation.
///
/// Returned as-is by [`CascadeDeleteEngine::prepare`] for confirmation
/// previews; kept as the backup by [`CascadeDeleteEngine::execute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionPlan {
    /// Id the caller asked to delete
    pub requested_id: ConversationId,
    /// The requested record and every alias of it, remote records first
    pub targets: Vec<DeletionTarget>,
    /// Linked poll(s), normally at most one
    pub polls: Vec<Poll>,
}

impl DeletionPlan {
    /// Ids this plan removes.
    #[must_use]
    pub fn deletion_set(&self) -> DeletionSet {
        DeletionSet {
            conversations: self
                .targets
                .iter()
                .map(|target| target.conversation.id.clone())
                .collect(),
            messages: self
                .targets
                .iter()
                .flat_map(|target| target.messages.iter().map(|message| message.id.clone()))
                .collect(),
            polls: self.polls.iter().map(|poll| poll.id.clone()).collect(),
        }
    }

    /// Mutations in execution order: messages, conversations, polls.
    #[must_use]
    pub fn steps(&self) -> Vec<DeletionStep> {
        let messages = self.targets.iter().map(|target| DeletionStep::Messages {
            source: target.source,
            conversation_id: target.conversation.id.clone(),
        });
        let conversations = self.targets.iter().map(|target| DeletionStep::Conversation {
            source: target.source,
            conversation_id: target.conversation.id.clone(),
        });
        let polls = self.polls.iter().map(|poll| DeletionStep::Poll {
            poll_id: poll.id.clone(),
        });
        messages.chain(conversations).chain(polls).collect()
    }

    /// Total number of messages in the unit.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.targets.iter().map(|target| target.messages.len()).sum()
    }

    fn target(&self, source: StoreKind, id: &ConversationId) -> Option<&DeletionTarget> {
        self.targets
            .iter()
            .find(|target| target.source == source && &target.conversation.id == id)
    }

    fn poll(&self, id: &PollId) -> Option<&Poll> {
        self.polls.iter().find(|poll| &poll.id == id)
    }
}

/// A failed deletion
#[derive(Debug, thiserror::Error)]
#[error("Cascade delete failed: {error}")]
pub struct DeletionFailure {
    /// What went wrong
    #[source]
    pub error: Error,
    /// Step that failed; `None` when planning failed
    pub failed_step: Option<DeletionStep>,
    /// Present once a mutation may have happened
    pub rollback: Option<Rollback>,
}

impl DeletionFailure {
    fn before_execution(error: Error) -> Self {
        Self {
            error,
            failed_step: None,
            rollback: None,
        }
    }

    /// State the request ended in.
    #[must_use]
    pub const fn state(&self) -> DeletionState {
        DeletionState::Failed {
            rollback_available: self.rollback.is_some(),
        }
    }

    /// Whether the conversation was absent at plan time.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.error.is_not_found()
    }
}

/// What a rollback put back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub conversations: usize,
    pub messages: usize,
    pub polls: usize,
}

/// Compensating action for a partially executed deletion.
///
/// Covers every step that completed plus the step that failed, since a
/// failing store call may have applied part of its change.
#[derive(Debug, Clone)]
pub struct Rollback {
    backup: DeletionPlan,
    attempted: Vec<DeletionStep>,
}

impl Rollback {
    /// Steps this rollback will undo, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[DeletionStep] {
        &self.attempted
    }

    /// Backup the rollback restores from.
    #[must_use]
    pub const fn backup(&self) -> &DeletionPlan {
        &self.backup
    }

    /// Reinsert backed-up records in reverse step order.
    ///
    /// Every step is attempted; if any reinsertion fails the first error is
    /// returned after the rest were tried.
    pub async fn restore<R, L, P>(
        self,
        engine: &CascadeDeleteEngine<R, L, P>,
    ) -> Result<RollbackReport>
    where
        R: ConversationStore,
        L: ConversationStore,
        P: PollStore,
    {
        let mut report = RollbackReport::default();
        let mut first_error: Option<Error> = None;

        for step in self.attempted.iter().rev() {
            let restored = match step {
                DeletionStep::Poll { poll_id } => match self.backup.poll(poll_id) {
                    Some(poll) => engine.polls.insert_poll(poll).await.map(|()| {
                        report.polls += 1;
                    }),
                    None => Ok(()),
                },
                DeletionStep::Conversation {
                    source,
                    conversation_id,
                } => match self.backup.target(*source, conversation_id) {
                    Some(target) => engine
                        .insert_conversation_in(*source, &target.conversation)
                        .await
                        .map(|()| {
                            report.conversations += 1;
                        }),
                    None => Ok(()),
                },
                DeletionStep::Messages {
                    source,
                    conversation_id,
                } => match self.backup.target(*source, conversation_id) {
                    Some(target) if !target.messages.is_empty() => engine
                        .insert_messages_in(*source, &target.messages)
                        .await
                        .map(|()| {
                            report.messages += target.messages.len();
                        }),
                    _ => Ok(()),
                },
            };

            if let Err(error) = restored {
                tracing::warn!(?step, %error, "Rollback step failed");
                first_error.get_or_insert(error);
            }
        }

        if let Some(error) = first_error {
            return Err(Error::Storage(format!(
                "rollback of {} incomplete: {error}",
                self.backup.requested_id
            )));
        }

        tracing::info!(
            conversation_id = %self.backup.requested_id,
            conversations = report.conversations,
            messages = report.messages,
            polls = report.polls,
            "Rolled back cascade delete"
        );
        Ok(report)
    }
}

/// Related records of a conversation, for confirmation prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedContent {
    pub message_count: usize,
    pub poll_id: Option<PollId>,
}

impl RelatedContent {
    #[must_use]
    pub const fn has_messages(&self) -> bool {
        self.message_count > 0
    }

    #[must_use]
    pub const fn has_poll(&self) -> bool {
        self.poll_id.is_some()
    }

    #[must_use]
    pub const fn has_any(&self) -> bool {
        self.has_messages() || self.has_poll()
    }
}

/// Deletes a conversation and its dependents across both stores
pub struct CascadeDeleteEngine<R, L, P> {
    remote: R,
    local: L,
    polls: P,
}

impl<R, L, P> CascadeDeleteEngine<R, L, P>
where
    R: ConversationStore,
    L: ConversationStore,
    P: PollStore,
{
    /// Create an engine over the remote store, the local cache and the poll store
    pub const fn new(remote: R, local: L, polls: P) -> Self {
        Self {
            remote,
            local,
            polls,
        }
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn local(&self) -> &L {
        &self.local
    }

    pub const fn polls(&self) -> &P {
        &self.polls
    }

    /// Build the deletion plan without mutating anything (dry run).
    pub async fn prepare(&self, conversation_id: &ConversationId) -> Result<DeletionPlan> {
        let remote_hit = self.remote.get_conversation(conversation_id).await?;
        let local_hit = self.local.get_conversation(conversation_id).await?;

        let Some(primary) = remote_hit.clone().or_else(|| local_hit.clone()) else {
            return Err(Error::NotFound(conversation_id.to_string()));
        };

        let mut records: Vec<(StoreKind, Conversation)> = Vec::new();
        let remote_records = Self::aliases_in(&self.remote, &primary, remote_hit).await?;
        records.extend(remote_records.into_iter().map(|c| (StoreKind::Remote, c)));
        let local_records = Self::aliases_in(&self.local, &primary, local_hit).await?;
        records.extend(local_records.into_iter().map(|c| (StoreKind::Local, c)));

        let mut targets = Vec::with_capacity(records.len());
        for (source, conversation) in records {
            let messages = self.messages_in(source, &conversation.id).await?;
            targets.push(DeletionTarget {
                source,
                conversation,
                messages,
            });
        }

        let polls = self.linked_polls(&targets).await?;

        let plan = DeletionPlan {
            requested_id: conversation_id.clone(),
            targets,
            polls,
        };
        tracing::debug!(
            conversation_id = %conversation_id,
            conversations = plan.targets.len(),
            messages = plan.message_count(),
            polls = plan.polls.len(),
            "Prepared cascade delete"
        );
        Ok(plan)
    }

    /// Delete the conversation, its messages and its poll as one unit.
    pub async fn execute(
        &self,
        conversation_id: &ConversationId,
    ) -> std::result::Result<DeletionSet, DeletionFailure> {
        self.execute_observed(conversation_id, |_| {}).await
    }

    /// [`Self::execute`], reporting every state the request enters to `observe`.
    pub async fn execute_observed<F>(
        &self,
        conversation_id: &ConversationId,
        mut observe: F,
    ) -> std::result::Result<DeletionSet, DeletionFailure>
    where
        F: FnMut(DeletionState),
    {
        let plan = match self.prepare(conversation_id).await {
            Ok(plan) => plan,
            Err(error) => {
                let failure = DeletionFailure::before_execution(error);
                observe(failure.state());
                return Err(failure);
            }
        };
        observe(DeletionState::Planned);

        let steps = plan.steps();
        observe(DeletionState::Executing);
        tracing::debug!(
            conversation_id = %conversation_id,
            state = ?DeletionState::Executing,
            steps = steps.len(),
            "Executing cascade delete"
        );

        let mut attempted = Vec::new();
        for step in steps {
            attempted.push(step.clone());
            if let Err(error) = self.run_step(&step).await {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    ?step,
                    %error,
                    "Cascade delete step failed; rollback available"
                );
                let failure = DeletionFailure {
                    error,
                    failed_step: Some(step),
                    rollback: Some(Rollback {
                        backup: plan,
                        attempted,
                    }),
                };
                observe(failure.state());
                return Err(failure);
            }
        }

        let deleted = plan.deletion_set();
        tracing::info!(
            conversation_id = %conversation_id,
            conversations = deleted.conversations.len(),
            messages = deleted.messages.len(),
            polls = deleted.polls.len(),
            state = ?DeletionState::Committed,
            "Committed cascade delete"
        );
        observe(DeletionState::Committed);
        Ok(deleted)
    }

    /// Whether a conversation currently has messages and/or a linked poll.
    ///
    /// Store errors are reported as "no related content".
    pub async fn has_related_content(&self, conversation_id: &ConversationId) -> RelatedContent {
        match self.prepare(conversation_id).await {
            Ok(plan) => RelatedContent {
                message_count: plan.message_count(),
                poll_id: plan.polls.first().map(|poll| poll.id.clone()),
            },
            Err(Error::NotFound(_)) => RelatedContent::default(),
            Err(error) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    %error,
                    "Could not inspect related content"
                );
                RelatedContent::default()
            }
        }
    }

    /// Records in `store` that are the same entity as `primary`.
    async fn aliases_in<S: ConversationStore>(
        store: &S,
        primary: &Conversation,
        direct_hit: Option<Conversation>,
    ) -> Result<Vec<Conversation>> {
        let mut found: Vec<Conversation> = direct_hit.into_iter().collect();

        if let Some(back_reference) = primary.back_reference() {
            let id = ConversationId::from(back_reference);
            if let Some(conversation) = store.get_conversation(&id).await? {
                push_unique(&mut found, conversation);
            }
        }

        if !primary.owner_id.is_empty() {
            for conversation in store.list_conversations(&primary.owner_id).await? {
                if same_entity(primary, &conversation) {
                    push_unique(&mut found, conversation);
                }
            }
        }

        Ok(found)
    }

    async fn linked_polls(&self, targets: &[DeletionTarget]) -> Result<Vec<Poll>> {
        let mut polls: Vec<Poll> = Vec::new();

        for target in targets {
            if let Some(poll) = self
                .polls
                .find_poll_by_conversation_id(&target.conversation.id)
                .await?
            {
                if !polls.iter().any(|existing| existing.id == poll.id) {
                    polls.push(poll);
                }
            }
        }

        for target in targets {
            let Some(poll_id) = target.conversation.linked_poll() else {
                continue;
            };
            if polls.iter().any(|existing| existing.id == poll_id) {
                continue;
            }
            if let Some(poll) = self.polls.get_poll(&PollId::from(poll_id)).await? {
                polls.push(poll);
            }
        }

        Ok(polls)
    }

    async fn run_step(&self, step: &DeletionStep) -> Result<()> {
        match step {
            DeletionStep::Messages {
                source: StoreKind::Remote,
                conversation_id,
            } => self.remote.delete_messages(conversation_id).await,
            DeletionStep::Messages {
                source: StoreKind::Local,
                conversation_id,
            } => self.local.delete_messages(conversation_id).await,
            DeletionStep::Conversation {
                source: StoreKind::Remote,
                conversation_id,
            } => self.remote.delete_conversation(conversation_id).await,
            DeletionStep::Conversation {
                source: StoreKind::Local,
                conversation_id,
            } => self.local.delete_conversation(conversation_id).await,
            DeletionStep::Poll { poll_id } => self.polls.delete_poll(poll_id).await,
        }
    }

    async fn messages_in(
        &self,
        source: StoreKind,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>> {
        match source {
            StoreKind::Remote => self.remote.get_messages(conversation_id).await,
            StoreKind::Local => self.local.get_messages(conversation_id).await,
        }
    }

    async fn insert_conversation_in(
        &self,
        source: StoreKind,
        conversation: &Conversation,
    ) -> Result<()> {
        match source {
            StoreKind::Remote => self.remote.insert_conversation(conversation).await,
            StoreKind::Local => self.local.insert_conversation(conversation).await,
        }
    }

    async fn insert_messages_in(&self, source: StoreKind, messages: &[Message]) -> Result<()> {
        match source {
            StoreKind::Remote => self.remote.insert_messages(messages).await,
            StoreKind::Local => self.local.insert_messages(messages).await,
        }
    }
}

fn push_unique(found: &mut Vec<Conversation>, conversation: Conversation) {
    if !found.iter().any(|existing| existing.id == conversation.id) {
        found.push(conversation);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::MessageRole;
    use crate::store::MemoryStore;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        GetMessages,
        DeleteMessages,
        DeleteConversation,
        DeletePoll,
        InsertConversation,
    }

    /// Wraps a `MemoryStore` and fails one kind of call.
    struct FailingStore {
        inner: MemoryStore,
        fail_on: Option<Op>,
        mutations: AtomicUsize,
    }

    impl FailingStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                fail_on: None,
                mutations: AtomicUsize::new(0),
            }
        }

        fn failing_on(inner: MemoryStore, op: Op) -> Self {
            Self {
                fail_on: Some(op),
                ..Self::new(inner)
            }
        }

        fn check(&self, op: Op) -> Result<()> {
            if self.fail_on == Some(op) {
                Err(Error::Storage(format!("injected failure on {op:?}")))
            } else {
                Ok(())
            }
        }

        fn mutated(&self) {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }

        fn mutation_count(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }
    }

    impl ConversationStore for FailingStore {
        async fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
            self.inner.get_conversation(id).await
        }

        async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>> {
            self.inner.list_conversations(owner_id).await
        }

        async fn delete_conversation(&self, id: &ConversationId) -> Result<()> {
            self.check(Op::DeleteConversation)?;
            self.mutated();
            self.inner.delete_conversation(id).await
        }

        async fn get_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
            self.check(Op::GetMessages)?;
            self.inner.get_messages(conversation_id).await
        }

        async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<()> {
            self.check(Op::DeleteMessages)?;
            self.mutated();
            self.inner.delete_messages(conversation_id).await
        }

        async fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
            self.mutated();
            self.inner.update_conversation(conversation).await
        }

        async fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
            self.check(Op::InsertConversation)?;
            self.inner.insert_conversation(conversation).await
        }

        async fn insert_messages(&self, messages: &[Message]) -> Result<()> {
            self.inner.insert_messages(messages).await
        }
    }

    impl PollStore for FailingStore {
        async fn find_poll_by_conversation_id(
            &self,
            conversation_id: &ConversationId,
        ) -> Result<Option<Poll>> {
            self.inner.find_poll_by_conversation_id(conversation_id).await
        }

        async fn get_poll(&self, id: &PollId) -> Result<Option<Poll>> {
            self.inner.get_poll(id).await
        }

        async fn delete_poll(&self, id: &PollId) -> Result<()> {
            self.check(Op::DeletePoll)?;
            self.mutated();
            self.inner.delete_poll(id).await
        }

        async fn insert_poll(&self, poll: &Poll) -> Result<()> {
            self.inner.insert_poll(poll).await
        }
    }

    struct Fixture {
        remote: MemoryStore,
        local: MemoryStore,
        polls: MemoryStore,
        conversation_id: ConversationId,
        messages: Vec<Message>,
    }

    /// Remote "uuid-456" with two messages and a poll, plus a local alias.
    fn fixture() -> Fixture {
        let mut remote_copy = Conversation::new("owner-1", "Poll Conversation");
        remote_copy.id = "uuid-456".into();
        let mut local_copy = remote_copy.clone();
        local_copy.id = "local-123".into();
        local_copy.back_reference_id = Some("uuid-456".into());

        let messages = vec![
            Message::new(remote_copy.id.clone(), MessageRole::User, "Friday?"),
            Message::new(remote_copy.id.clone(), MessageRole::Assistant, "Made a poll"),
        ];
        let local_messages = vec![Message::new(
            local_copy.id.clone(),
            MessageRole::User,
            "Friday?",
        )];
        let poll = Poll::new(remote_copy.id.clone(), "owner-1", "When?");

        Fixture {
            remote: MemoryStore::seeded([remote_copy.clone()], messages.clone(), []),
            local: MemoryStore::seeded([local_copy], local_messages, []),
            polls: MemoryStore::seeded([], [], [poll]),
            conversation_id: remote_copy.id,
            messages,
        }
    }

    #[tokio::test]
    async fn prepare_missing_reports_not_found_without_mutations() {
        let fx = fixture();
        let remote = FailingStore::new(fx.remote);
        let local = FailingStore::new(fx.local);
        let polls = FailingStore::new(fx.polls);
        let engine = CascadeDeleteEngine::new(&remote, &local, &polls);

        let error = engine.prepare(&"missing-id".into()).await.unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(
            remote.mutation_count() + local.mutation_count() + polls.mutation_count(),
            0
        );
    }

    #[tokio::test]
    async fn prepare_collects_aliases_messages_and_poll() {
        let fx = fixture();
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, fx.polls);

        let plan = engine.prepare(&fx.conversation_id).await.unwrap();
        let set = plan.deletion_set();
        assert_eq!(
            set.conversations,
            vec![ConversationId::from("uuid-456"), "local-123".into()]
        );
        assert_eq!(set.messages.len(), 3);
        assert_eq!(set.polls.len(), 1);

        // dry run leaves everything in place
        assert_eq!(engine.remote().message_count().await, 2);
        assert_eq!(engine.local().conversation_count().await, 1);
        assert_eq!(engine.polls().poll_count().await, 1);
    }

    #[tokio::test]
    async fn steps_run_messages_then_conversations_then_poll() {
        let fx = fixture();
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, fx.polls);
        let plan = engine.prepare(&fx.conversation_id).await.unwrap();

        let kinds = plan
            .steps()
            .iter()
            .map(|step| match step {
                DeletionStep::Messages { source, .. } => format!("messages:{}", source.as_str()),
                DeletionStep::Conversation { source, .. } => {
                    format!("conversation:{}", source.as_str())
                }
                DeletionStep::Poll { .. } => "poll".to_string(),
            })
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                "messages:remote",
                "messages:local",
                "conversation:remote",
                "conversation:local",
                "poll",
            ]
        );
    }

    #[tokio::test]
    async fn execute_removes_the_whole_unit() {
        let fx = fixture();
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, fx.polls);
        let id = fx.conversation_id;

        let deleted = engine.execute(&id).await.unwrap();
        assert_eq!(deleted.conversations.len(), 2);

        assert!(engine.remote().get_conversation(&id).await.unwrap().is_none());
        assert!(engine.remote().get_messages(&id).await.unwrap().is_empty());
        assert!(engine
            .polls()
            .find_poll_by_conversation_id(&id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(engine.local().conversation_count().await, 0);
        assert_eq!(engine.local().message_count().await, 0);
    }

    #[tokio::test]
    async fn execute_through_local_alias_also_removes_remote_record() {
        let fx = fixture();
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, fx.polls);

        engine.execute(&"local-123".into()).await.unwrap();
        assert_eq!(engine.remote().conversation_count().await, 0);
        assert_eq!(engine.local().conversation_count().await, 0);
        assert_eq!(engine.polls().poll_count().await, 0);
    }

    #[tokio::test]
    async fn observed_states_follow_the_lifecycle() {
        let fx = fixture();
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, fx.polls);
        let mut states = Vec::new();
        engine
            .execute_observed(&fx.conversation_id, |state| states.push(state))
            .await
            .unwrap();
        assert_eq!(
            states,
            vec![
                DeletionState::Planned,
                DeletionState::Executing,
                DeletionState::Committed,
            ]
        );

        let fx = fixture();
        let polls = FailingStore::failing_on(fx.polls, Op::DeletePoll);
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, polls);
        let mut states = Vec::new();
        let failure = engine
            .execute_observed(&fx.conversation_id, |state| states.push(state))
            .await
            .unwrap_err();
        assert_eq!(
            states,
            vec![
                DeletionState::Planned,
                DeletionState::Executing,
                DeletionState::Failed {
                    rollback_available: true
                },
            ]
        );
        assert_eq!(states.last(), Some(&failure.state()));

        let mut states = Vec::new();
        let missing = engine
            .execute_observed(&"missing-id".into(), |state| states.push(state))
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
        assert_eq!(
            states,
            vec![DeletionState::Failed {
                rollback_available: false
            }]
        );
    }

    #[tokio::test]
    async fn rollback_restores_messages_when_conversation_delete_fails() {
        let fx = fixture();
        let remote = FailingStore::failing_on(fx.remote, Op::DeleteConversation);
        let engine = CascadeDeleteEngine::new(remote, fx.local, fx.polls);
        let id = fx.conversation_id;

        let failure = engine.execute(&id).await.unwrap_err();
        assert!(matches!(
            failure.failed_step,
            Some(DeletionStep::Conversation {
                source: StoreKind::Remote,
                ..
            })
        ));
        assert_eq!(
            failure.state(),
            DeletionState::Failed {
                rollback_available: true
            }
        );
        assert!(engine.remote().get_messages(&id).await.unwrap().is_empty());

        let rollback = failure.rollback.unwrap();
        let report = rollback.restore(&engine).await.unwrap();
        assert_eq!(report.messages, 3);

        assert_eq!(engine.remote().get_messages(&id).await.unwrap(), fx.messages);
        assert!(engine.remote().get_conversation(&id).await.unwrap().is_some());
        assert_eq!(engine.local().message_count().await, 1);
        assert_eq!(engine.polls().poll_count().await, 1);
    }

    #[tokio::test]
    async fn rollback_restores_everything_when_poll_delete_fails() {
        let fx = fixture();
        let polls = FailingStore::failing_on(fx.polls, Op::DeletePoll);
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, polls);
        let id = fx.conversation_id;

        let failure = engine.execute(&id).await.unwrap_err();
        assert_eq!(engine.remote().conversation_count().await, 0);

        let report = failure.rollback.unwrap().restore(&engine).await.unwrap();
        assert_eq!(
            report,
            RollbackReport {
                conversations: 2,
                messages: 3,
                polls: 1,
            }
        );
        assert_eq!(engine.remote().get_messages(&id).await.unwrap(), fx.messages);
        assert_eq!(engine.local().conversation_count().await, 1);
        assert_eq!(engine.polls().inner.poll_count().await, 1);
    }

    #[tokio::test]
    async fn planning_failure_has_no_rollback() {
        let fx = fixture();
        let remote = FailingStore::failing_on(fx.remote, Op::GetMessages);
        let engine = CascadeDeleteEngine::new(remote, fx.local, fx.polls);

        let failure = engine.execute(&fx.conversation_id).await.unwrap_err();
        assert!(failure.rollback.is_none());
        assert!(failure.failed_step.is_none());
        assert_eq!(engine.remote().mutation_count(), 0);
        assert_eq!(engine.remote().inner.message_count().await, 2);
    }

    #[tokio::test]
    async fn execute_missing_is_not_found() {
        let fx = fixture();
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, fx.polls);

        let failure = engine.execute(&"missing-id".into()).await.unwrap_err();
        assert!(failure.is_not_found());
        assert!(failure.rollback.is_none());
    }

    #[tokio::test]
    async fn failed_restore_is_surfaced() {
        let fx = fixture();
        let remote = FailingStore {
            fail_on: Some(Op::DeleteConversation),
            ..FailingStore::new(fx.remote)
        };
        let engine = CascadeDeleteEngine::new(remote, fx.local, fx.polls);
        let failure = engine.execute(&fx.conversation_id).await.unwrap_err();
        let rollback = failure.rollback.unwrap();

        let broken = CascadeDeleteEngine::new(
            FailingStore::failing_on(MemoryStore::new(), Op::InsertConversation),
            MemoryStore::new(),
            MemoryStore::new(),
        );
        let error = rollback.restore(&broken).await.unwrap_err();
        assert!(error.to_string().contains("rollback"));
    }

    #[tokio::test]
    async fn poll_found_through_linked_poll_id() {
        let mut conversation = Conversation::new("owner-1", "Linked");
        let mut poll = Poll::new("somewhere-else".into(), "owner-1", "Linked poll");
        poll.id = "poll-7".into();
        conversation.linked_poll_id = Some(poll.id.clone());

        let engine = CascadeDeleteEngine::new(
            MemoryStore::new(),
            MemoryStore::seeded([conversation.clone()], [], []),
            MemoryStore::seeded([], [], [poll]),
        );

        let related = engine.has_related_content(&conversation.id).await;
        assert_eq!(related.poll_id, Some(PollId::from("poll-7")));
        assert!(!related.has_messages());

        engine.execute(&conversation.id).await.unwrap();
        assert_eq!(engine.polls().poll_count().await, 0);
    }

    #[tokio::test]
    async fn has_related_content_reports_and_tolerates_errors() {
        let fx = fixture();
        let engine = CascadeDeleteEngine::new(fx.remote, fx.local, fx.polls);
        let related = engine.has_related_content(&fx.conversation_id).await;
        assert_eq!(related.message_count, 3);
        assert!(related.has_poll());
        assert!(related.has_any());

        let missing = engine.has_related_content(&"missing-id".into()).await;
        assert_eq!(missing, RelatedContent::default());

        let fx = fixture();
        let broken = CascadeDeleteEngine::new(
            FailingStore::failing_on(fx.remote, Op::GetMessages),
            fx.local,
            fx.polls,
        );
        let related = broken.has_related_content(&fx.conversation_id).await;
        assert!(!related.has_any());
    }
}
