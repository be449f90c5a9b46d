use pollchat_core::cascade::{DeletionFailure, DeletionSet};
use pollchat_core::ConversationId;

use crate::commands::common::{
    describe_step, format_plan_lines, format_rollback_report, normalize_conversation_id,
    open_service, CliService,
};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_delete(settings: &Settings, id: &str, dry_run: bool) -> Result<(), CliError> {
    let conversation_id = normalize_conversation_id(id)?;
    let service = open_service(settings)?;

    if dry_run {
        let plan = service.preview_delete(&conversation_id).await?;
        println!("Would delete:");
        for line in format_plan_lines(&plan) {
            println!("  {line}");
        }
        return Ok(());
    }

    let deleted = delete_with_rollback(&service, &conversation_id).await?;
    println!(
        "Deleted {} conversation(s), {} message(s), {} poll(s)",
        deleted.conversations.len(),
        deleted.messages.len(),
        deleted.polls.len()
    );
    Ok(())
}

/// Delete, and on failure restore whatever was removed before reporting.
pub async fn delete_with_rollback(
    service: &CliService,
    conversation_id: &ConversationId,
) -> Result<DeletionSet, CliError> {
    match service.delete(conversation_id).await {
        Ok(deleted) => Ok(deleted),
        Err(failure) if failure.rollback.is_none() => Err(failure.error.into()),
        Err(failure) => Err(CliError::DeleteFailed(
            rollback_after_failure(service, failure).await,
        )),
    }
}

async fn rollback_after_failure(service: &CliService, failure: DeletionFailure) -> String {
    let mut message = match &failure.failed_step {
        Some(step) => format!("{} failed: {}", describe_step(step), failure.error),
        None => failure.error.to_string(),
    };

    match service.rollback(failure).await {
        Ok(Some(report)) => {
            message.push_str("; rollback ");
            message.push_str(&format_rollback_report(&report));
        }
        Ok(None) => message.push_str("; nothing was changed"),
        Err(error) => {
            tracing::warn!(%error, "Rollback incomplete");
            message.push_str(&format!("; rollback failed: {error}"));
        }
    }
    message
}
