use std::sync::Arc;

use chrono::Utc;
use pollchat_core::cascade::{DeletionPlan, DeletionStep, RollbackReport};
use pollchat_core::db::SqliteStore;
use pollchat_core::services::ConversationService;
use pollchat_core::{Conversation, ConversationId};
use serde::Serialize;

use crate::config::Settings;
use crate::error::CliError;

/// Remote store doubles as the poll store; both share one connection.
pub type CliService = ConversationService<Arc<SqliteStore>, SqliteStore, Arc<SqliteStore>>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationListItem {
    pub id: String,
    pub title: String,
    pub is_favorite: bool,
    pub favorite_rank: Option<u32>,
    pub message_count: u32,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub linked_poll_id: Option<String>,
}

pub fn open_service(settings: &Settings) -> Result<CliService, CliError> {
    let remote = Arc::new(SqliteStore::open(&settings.remote_db)?);
    let local = SqliteStore::open(&settings.local_db)?;
    Ok(ConversationService::new(Arc::clone(&remote), local, remote))
}

pub fn normalize_conversation_id(id: &str) -> Result<ConversationId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyConversationId)
    } else {
        Ok(ConversationId::from(trimmed))
    }
}

pub fn conversation_to_list_item(conversation: &Conversation) -> ConversationListItem {
    let now_ms = Utc::now().timestamp_millis();
    ConversationListItem {
        id: conversation.id.to_string(),
        title: conversation.title.clone(),
        is_favorite: conversation.is_favorite,
        favorite_rank: conversation.favorite_rank,
        message_count: conversation.message_count,
        created_at: conversation.created_at,
        updated_at: conversation.updated_at,
        relative_time: format_relative_time(conversation.updated_at, now_ms),
        linked_poll_id: conversation.linked_poll().map(str::to_string),
    }
}

pub fn format_conversation_lines(conversations: &[Conversation], now_ms: i64) -> Vec<String> {
    conversations
        .iter()
        .map(|conversation| {
            let marker = match (conversation.is_favorite, conversation.favorite_rank) {
                (true, Some(rank)) => format!("*{rank}"),
                (true, None) => "*".to_string(),
                (false, _) => String::new(),
            };
            let short_id = conversation.id.as_str().chars().take(13).collect::<String>();
            let title = truncate(&conversation.title, 40);
            let relative_time = format_relative_time(conversation.updated_at, now_ms);
            format!(
                "{marker:<4}{short_id:<13}  {title:<40}  {:>4} msg  {relative_time}",
                conversation.message_count
            )
        })
        .collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < year {
        format!("{}w ago", diff / week)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn describe_step(step: &DeletionStep) -> String {
    match step {
        DeletionStep::Messages {
            source,
            conversation_id,
        } => format!("delete messages of {conversation_id} ({})", source.as_str()),
        DeletionStep::Conversation {
            source,
            conversation_id,
        } => format!("delete conversation {conversation_id} ({})", source.as_str()),
        DeletionStep::Poll { poll_id } => format!("delete poll {poll_id}"),
    }
}

pub fn format_plan_lines(plan: &DeletionPlan) -> Vec<String> {
    let mut lines = plan
        .targets
        .iter()
        .map(|target| {
            format!(
                "{:<7} conversation {}  {} message(s)",
                target.source.as_str(),
                target.conversation.id,
                target.messages.len()
            )
        })
        .collect::<Vec<_>>();
    lines.extend(
        plan.polls
            .iter()
            .map(|poll| format!("poll    {}  {}", poll.id, truncate(&poll.title, 40))),
    );
    lines
}

pub fn format_rollback_report(report: &RollbackReport) -> String {
    format!(
        "restored {} conversation(s), {} message(s), {} poll(s)",
        report.conversations, report.messages, report.polls
    )
}
