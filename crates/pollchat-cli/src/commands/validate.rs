use pollchat_core::ranking::RankValidation;

use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_validate(settings: &Settings, as_json: bool) -> Result<(), CliError> {
    let owner_id = settings.owner()?;
    let service = open_service(settings)?;
    let report = service.validate_ranks(owner_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_validation_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_validation_lines(report: &RankValidation) -> Vec<String> {
    if report.is_valid {
        return vec!["Favorite ranks are valid".to_string()];
    }

    let mut lines = report
        .errors
        .iter()
        .map(|issue| format!("error: {issue}"))
        .collect::<Vec<_>>();
    lines.extend(
        report
            .suggestions
            .iter()
            .map(|suggestion| format!("hint: {suggestion}")),
    );
    lines
}
