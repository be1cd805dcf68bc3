//! Pull request text for an update.

use crate::models::{UpdateFields, UpdateRequest};

/// Summary line used as the profile commit message and the pull request title.
pub fn pr_title(full_name: &str) -> String {
    format!("Update {}'s board member profile", full_name)
}

/// Markdown list of the fields supplied by the request.
pub fn to_changelog(fields: &UpdateFields) -> String {
    let entries = [
        ("Full Name", &fields.full_name),
        ("Picture", &fields.picture_source_url),
        ("GitHub Tag", &fields.github_tag),
        ("Discord Tag", &fields.discord_tag),
        ("LinkedIn Tag", &fields.linkedin_tag),
    ];

    let mut lines: Vec<String> = entries
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(|value| format!("- **{}**: {}", label, value))
        })
        .collect();
    if fields.rename_picture {
        lines.push("- **Picture**: renamed to match the full name".to_string());
    }
    lines.join("\n")
}

pub fn pr_body(request: &UpdateRequest) -> String {
    let requester = request
        .actor
        .display_name
        .as_deref()
        .unwrap_or(&request.actor.identity);
    let changelog = to_changelog(&request.fields);

    if changelog.is_empty() {
        format!("Requested by {}.", requester)
    } else {
        format!("{}\n\nRequested by {}.", changelog, requester)
    }
}
