//! Conversation listing CLI command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use chatline_types::chat::UserId;

use crate::state::AppState;

/// List a user's conversations, most recent first.
///
/// # Examples
///
/// ```bash
/// chatline conversations --user 1
/// chatline conversations --user 1 --json
/// ```
pub async fn list_conversations(state: &AppState, user: i64, json: bool) -> Result<()> {
    let conversations = state.chat_service.list_conversations(UserId(user)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations for user {}.",
            style("i").blue().bold(),
            style(user).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for conversation in &conversations {
        table.add_row(vec![
            Cell::new(conversation.id).fg(Color::Cyan),
            Cell::new(conversation.created_at.format("%Y-%m-%d %H:%M:%S")).fg(Color::White),
        ]);
    }

    println!();
    println!("  Conversations for user {}", style(user).cyan().bold());
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} conversation{}",
        style(conversations.len()).bold(),
        if conversations.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
