//! Message listing CLI command.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use chatline_types::chat::{ConversationId, MessageView, Sender};

use crate::state::AppState;

const PREVIEW_CHARS: usize = 80;

/// Show the messages of a conversation in order.
///
/// `--json` prints the same `{sender, content, timestamp}` view the HTTP API
/// returns from `/api/messages`.
pub async fn list_messages(state: &AppState, conversation: i64, json: bool) -> Result<()> {
    let messages = state
        .chat_service
        .list_messages(ConversationId(conversation))
        .await
        .with_context(|| format!("Conversation {conversation} not found"))?;

    if json {
        let views: Vec<MessageView> = messages.into_iter().map(MessageView::from).collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!();
        println!(
            "  {} Conversation {} has no messages yet.",
            style("i").blue().bold(),
            style(conversation).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Sender").fg(Color::White),
        Cell::new("Content").fg(Color::White),
    ]);

    for message in &messages {
        let sender_cell = match message.sender {
            Sender::User => Cell::new("user").fg(Color::Green),
            Sender::Bot => Cell::new("bot").fg(Color::Magenta),
        };
        table.add_row(vec![
            Cell::new(message.timestamp.format("%H:%M:%S")).fg(Color::DarkGrey),
            sender_cell,
            Cell::new(preview(&message.content)),
        ]);
    }

    println!();
    println!("  Conversation {}", style(conversation).cyan().bold());
    println!();
    println!("{table}");
    println!();

    Ok(())
}

fn preview(content: &str) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{cut}...")
    } else {
        flat
    }
}
