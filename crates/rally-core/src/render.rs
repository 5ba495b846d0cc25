use rally_types::models::{Button, Embed, EmbedField, Reply};

use crate::registry::MessageReplyState;

const COLOR_POINTS: u32 = 0x2ecc71;
const COLOR_PENALTY: u32 = 0xe74c3c;
const COLOR_RESOLUTION: u32 = 0x3498db;
const COLOR_MUTED: u32 = 0x95a5a6;

pub const CANCEL_PREFIX: &str = "resolution:cancel:";

/// "Why you got points" reply for one message.
pub fn points_embed(author_name: &str, state: &MessageReplyState) -> Reply {
    let total = state.total_points();
    let reasons = state
        .reasons()
        .iter()
        .map(|r| format!("• {} {} ({:+})", r.emoji, r.text, r.delta))
        .collect::<Vec<_>>()
        .join("\n");

    Reply::embed(Embed {
        title: format!("{} earned {} points", author_name, total),
        description: Some(reasons),
        fields: vec![EmbedField {
            name: "Total".into(),
            value: total.to_string(),
            inline: true,
        }],
        color: Some(if total < 0 { COLOR_PENALTY } else { COLOR_POINTS }),
    })
}

pub fn cancel_button_id(case_id: &str) -> String {
    format!("{}{}", CANCEL_PREFIX, case_id)
}

/// Extract the case id from a cancel button's custom id.
pub fn parse_cancel_button(custom_id: &str) -> Option<&str> {
    custom_id.strip_prefix(CANCEL_PREFIX).filter(|id| !id.is_empty())
}

pub fn resolution_prompt(case_id: &str, hours: u64) -> Reply {
    Reply::embed(Embed {
        title: "Marked as resolved".into(),
        description: Some(format!(
            "This thread looks resolved and will be closed automatically in {} hours. \
             If you still need help, press the button below.",
            hours * 2
        )),
        fields: vec![],
        color: Some(COLOR_RESOLUTION),
    })
    .with_button(Button {
        custom_id: cancel_button_id(case_id),
        label: "I still need help".into(),
    })
}

pub fn resolution_reminder(hours: u64) -> Reply {
    Reply::text(format!(
        "Reminder: this thread will be closed in {} hours unless someone asks for more help.",
        hours
    ))
}

pub fn resolution_cancelled() -> Reply {
    Reply::embed(Embed {
        title: "Needs more detail".into(),
        description: Some(
            "Automatic closing was cancelled. Please add more detail so someone can follow up."
                .into(),
        ),
        fields: vec![],
        color: Some(COLOR_MUTED),
    })
}
