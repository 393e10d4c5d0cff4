//! Plain-text rendering of webinar data for tool results.

use super::models::{ProposalWithSpeakers, Speaker};

/// Longest proposal description rendered before truncation.
pub const DESCRIPTION_LIMIT: usize = 300;
/// Longest speaker bio rendered before truncation.
pub const BIO_LIMIT: usize = 200;

const ELLIPSIS: &str = "...";

/// Separator placed between rendered items.
pub fn separator() -> String {
    format!("\n{}\n", "-".repeat(50))
}

/// Cut `text` to `limit` characters and mark the cut with `...`.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

fn speaker_line(speaker: &Speaker) -> String {
    let mut line = speaker.full_name();
    if !speaker.email.is_empty() {
        line.push_str(&format!(" ({})", speaker.email));
    }
    if !speaker.twitter.is_empty() {
        line.push_str(&format!(" - @{}", speaker.twitter));
    }
    line
}

pub fn render_proposal(item: &ProposalWithSpeakers) -> String {
    let proposal = &item.proposal;

    let speakers = if item.speakers.is_empty() {
        "Speaker not specified".to_string()
    } else {
        item.speakers
            .iter()
            .map(speaker_line)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut lines = vec![
        format!(
            "📅 Webinar #{}: {}",
            proposal.webinar_number, proposal.title
        ),
        format!("👤 Speaker(s): {}", speakers),
        format!("📆 Date: {}", proposal.event_date.format("%d-%B-%Y")),
        format!(
            "📝 Description: {}",
            truncate(&proposal.description, DESCRIPTION_LIMIT)
        ),
    ];

    if let Some(meetup) = proposal.meetup.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("🔗 Meetup: {}", meetup));
    }
    if let Some(live) = proposal.live_streaming.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("📺 Live: {}", live));
    }

    lines.join("\n")
}

pub fn render_speaker(speaker: &Speaker) -> String {
    let mut lines = vec![format!("👤 {}", speaker.full_name())];
    if !speaker.email.is_empty() {
        lines.push(format!("📧 {}", speaker.email));
    }
    if !speaker.twitter.is_empty() {
        lines.push(format!("🐦 @{}", speaker.twitter));
    }
    lines.push(format!(
        "📝 Bio: {}",
        truncate(&speaker.description, BIO_LIMIT)
    ));
    lines.join("\n")
}

pub fn render_proposals(items: &[ProposalWithSpeakers]) -> String {
    items
        .iter()
        .map(render_proposal)
        .collect::<Vec<_>>()
        .join(&separator())
}

pub fn render_speakers(speakers: &[Speaker]) -> String {
    speakers
        .iter()
        .map(render_speaker)
        .collect::<Vec<_>>()
        .join(&separator())
}
