// src/formatting.rs

use crate::constants::{ASSEMBLY_NAME, COST};
use crate::core::{EventAction, EventData};

/// A trait for rendering an event into the text body of a notification.
pub trait TextFormatter: Send + Sync {
    fn format_event(&self, action: &EventAction, data: &EventData) -> String;
}

/// Subject line shared by the mail relay and chat messages.
pub fn subject(action: &EventAction, data: &EventData) -> String {
    match data.get(ASSEMBLY_NAME) {
        Some(name) => format!("[{}] {}", action, name),
        None => format!("[{}]", action),
    }
}

/// Payload entries sorted by key, so output is stable.
fn sorted_fields(data: &EventData) -> Vec<(&str, &str)> {
    let mut fields: Vec<(&str, &str)> = data
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    fields.sort_unstable();
    fields
}

/// Plain `key: value` lines, for mail and SMS.
pub struct PlainTextFormatter;

impl TextFormatter for PlainTextFormatter {
    fn format_event(&self, action: &EventAction, data: &EventData) -> String {
        let mut lines = vec![format!("Event: {}", action)];
        lines.extend(
            sorted_fields(data)
                .into_iter()
                .map(|(key, value)| format!("{}: {}", key, value)),
        );
        lines.join("\n")
    }
}

/// A formatter for Slack: bold action and a code block with the payload.
pub struct SlackTextFormatter;

impl TextFormatter for SlackTextFormatter {
    fn format_event(&self, action: &EventAction, data: &EventData) -> String {
        let mut header = format!("*{}*", action);
        if let Some(name) = data.get(ASSEMBLY_NAME) {
            header.push_str(&format!(" `{}`", name));
        }
        if let Some(cost) = data.get(COST) {
            header.push_str(&format!(" (cost {})", cost));
        }

        if data.is_empty() {
            return header;
        }

        let lines: Vec<String> = sorted_fields(data)
            .into_iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect();
        format!("{}\n```\n{}\n```", header, lines.join("\n"))
    }
}
