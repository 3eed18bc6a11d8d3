pub mod command;
pub mod engine;
pub mod session;

use std::sync::Arc;

use anyhow::Result;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use tracing::{info, warn};

use crate::access::Identity;
use crate::bot::engine::{ConversationEngine, Reply};

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

fn render_keyboard(reply: &Reply) -> Option<InlineKeyboardMarkup> {
    reply.keyboard.as_ref().map(|rows| {
        InlineKeyboardMarkup::new(rows.iter().map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.encode()))
        }))
    })
}

async fn send_replies(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) -> ResponseResult<()> {
    for reply in replies {
        let chunks = split_message(&reply.text, 4000);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut request = bot.send_message(chat_id, chunk);
            if reply.html {
                request = request.parse_mode(ParseMode::Html);
            }
            // Keyboard goes on the final chunk so it lands under the text.
            if i == last {
                if let Some(keyboard) = render_keyboard(&reply) {
                    request = request.reply_markup(keyboard);
                }
            }
            request.await?;
        }
    }
    Ok(())
}

/// Run the Telegram bot until the process exits.
pub async fn run(engine: Arc<ConversationEngine>, bot: Bot) -> Result<()> {
    info!("Starting Telegram bot...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    engine: Arc<ConversationEngine>,
) -> ResponseResult<()> {
    let user = match msg.from.as_ref() {
        Some(user) => user,
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    // Users without a username never match the allow-list.
    let who = Identity::new(user.username.clone().unwrap_or_default());

    info!("Message from @{}: {}", who.username, text);

    let replies = engine.handle_text(msg.chat.id.0, &who, &text).await;
    send_replies(&bot, msg.chat.id, replies).await
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    engine: Arc<ConversationEngine>,
) -> ResponseResult<()> {
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let who = Identity::new(q.from.username.clone().unwrap_or_default());

    let replies = engine.handle_callback(chat_id.0, &who, &data).await;
    send_replies(&bot, chat_id, replies).await?;

    bot.answer_callback_query(q.id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_message_short_passthrough() {
        assert_eq!(split_message("hello", 4000), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_message_prefers_newline_boundaries() {
        let text = "line one\nline two\nline three";
        let chunks = split_message(text, 12);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
    }
}
