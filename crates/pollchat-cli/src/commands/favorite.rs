use pollchat_core::Conversation;

use crate::commands::common::{normalize_conversation_id, open_service};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_set_favorite(
    settings: &Settings,
    id: &str,
    favorite: bool,
) -> Result<(), CliError> {
    let owner_id = settings.owner()?;
    let conversation_id = normalize_conversation_id(id)?;
    let service = open_service(settings)?;

    let updated = service
        .set_favorite(owner_id, &conversation_id, favorite)
        .await?;
    println!("{}", describe_favorite(&updated));
    Ok(())
}

pub async fn run_reorder(settings: &Settings, id: &str, rank: u32) -> Result<(), CliError> {
    let owner_id = settings.owner()?;
    let conversation_id = normalize_conversation_id(id)?;
    let service = open_service(settings)?;

    let updated = service.reorder(owner_id, &conversation_id, rank).await?;
    println!("{}", describe_favorite(&updated));

    let report = service.validate_ranks(owner_id).await?;
    if !report.is_valid {
        println!("Ranks now need normalizing; run `pollchat normalize`");
    }
    Ok(())
}

pub async fn run_normalize(settings: &Settings) -> Result<(), CliError> {
    let owner_id = settings.owner()?;
    let service = open_service(settings)?;

    let changed = service.normalize_ranks(owner_id).await?;
    println!("Renumbered {changed} conversation(s)");
    Ok(())
}

pub fn describe_favorite(conversation: &Conversation) -> String {
    match (conversation.is_favorite, conversation.favorite_rank) {
        (true, Some(rank)) => format!("{}  favorite #{rank}", conversation.id),
        (true, None) => format!("{}  favorite (unranked)", conversation.id),
        (false, _) => format!("{}  not a favorite", conversation.id),
    }
}
