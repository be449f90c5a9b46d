use chrono::Utc;
use pollchat_core::sort::{SortCriteria, SortOptions, SortOrder};

use crate::commands::common::{
    conversation_to_list_item, format_conversation_lines, open_service, ConversationListItem,
};
use crate::config::Settings;
use crate::error::CliError;

/// Apply command-line sort flags over the configured defaults.
pub fn sort_options(
    defaults: SortOptions,
    criteria: Option<SortCriteria>,
    order: Option<SortOrder>,
    no_favorite_first: bool,
) -> SortOptions {
    SortOptions {
        criteria: criteria.unwrap_or(defaults.criteria),
        order: order.unwrap_or(defaults.order),
        favorite_first: defaults.favorite_first && !no_favorite_first,
    }
}

pub async fn run_list(
    settings: &Settings,
    options: &SortOptions,
    as_json: bool,
) -> Result<(), CliError> {
    let owner_id = settings.owner()?;
    let service = open_service(settings)?;
    let conversations = service.list(owner_id, options).await?;

    if as_json {
        let json_items = conversations
            .iter()
            .map(conversation_to_list_item)
            .collect::<Vec<ConversationListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        let now_ms = Utc::now().timestamp_millis();
        for line in format_conversation_lines(&conversations, now_ms) {
            println!("{line}");
        }
    }

    Ok(())
}
