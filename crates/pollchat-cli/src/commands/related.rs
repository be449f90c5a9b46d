use pollchat_core::cascade::RelatedContent;

use crate::commands::common::{normalize_conversation_id, open_service};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_related(settings: &Settings, id: &str) -> Result<(), CliError> {
    let conversation_id = normalize_conversation_id(id)?;
    let service = open_service(settings)?;
    let related = service.has_related_content(&conversation_id).await;
    println!("{}", describe_related(&related));
    Ok(())
}

pub fn describe_related(related: &RelatedContent) -> String {
    match (&related.poll_id, related.has_messages()) {
        (None, false) => "No related content".to_string(),
        (None, true) => format!("{} message(s)", related.message_count),
        (Some(poll_id), false) => format!("poll {poll_id}"),
        (Some(poll_id), true) => format!("{} message(s), poll {poll_id}", related.message_count),
    }
}
