//! Telegram bot front end.

use std::sync::Arc;
use std::time::Duration;

use teloxide::RequestError;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, KeyboardButton, KeyboardMarkup, ParseMode};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::NotifierHandle;
use crate::commands::{CommandHandler, CommandResult, MAIN_KEYBOARD};

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Flood wait required: {0:?}")]
    FloodWait(Duration),

    #[error("Telegram request failed: {0}")]
    Request(RequestError),

    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    QueueClosed,
}

impl From<RequestError> for TelegramError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::RetryAfter(seconds) => Self::FloodWait(seconds.duration()),
            other => Self::Request(other),
        }
    }
}

/// Long-polling bot that feeds chat messages to the command handler.
pub struct TelegramBot {
    /// The underlying Bot API client.
    bot: Bot,

    /// Command handler shared by all updates.
    handler: Arc<CommandHandler>,

    /// Queue of notices for the organiser.
    notifier: NotifierHandle,
}

impl TelegramBot {
    /// Creates a bot for the given API token.
    #[must_use]
    pub fn new(token: impl Into<String>, handler: Arc<CommandHandler>, notifier: NotifierHandle) -> Self {
        Self {
            bot: Bot::new(token),
            handler,
            notifier,
        }
    }

    /// Returns the underlying Bot API client.
    #[must_use]
    pub fn inner(&self) -> &Bot {
        &self.bot
    }

    /// Processes updates until Ctrl+C.
    pub async fn run(self) {
        match self.bot.get_me().await {
            Ok(me) => info!("Polling updates as @{}", me.username()),
            Err(e) => warn!("Could not fetch bot info: {}", e),
        }

        Dispatcher::builder(self.bot, schema())
            .dependencies(dptree::deps![self.handler, self.notifier])
            .default_handler(|update| async move {
                debug!("Ignoring update {:?}", update.id);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "Failed to answer message",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

fn schema() -> UpdateHandler<TelegramError> {
    Update::filter_message().endpoint(handle_message)
}

/// Answers one incoming text message.
async fn handle_message(
    bot: Bot,
    handler: Arc<CommandHandler>,
    notifier: NotifierHandle,
    msg: Message,
) -> Result<(), TelegramError> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };

    let Some(result) = handler.handle(user.id.0, text).await else {
        return Ok(());
    };

    if let Some(notice) = &result.admin_notice
        && let Err(e) = notifier.notify(notice.as_str())
    {
        warn!("Failed to queue admin notice: {}", e);
    }

    send_reply(&bot, msg.chat.id, &result).await
}

/// Sends the rendered reply, with the main keyboard when requested.
async fn send_reply(bot: &Bot, chat_id: ChatId, result: &CommandResult) -> Result<(), TelegramError> {
    let request = bot
        .send_message(chat_id, result.message.as_str())
        .parse_mode(ParseMode::Html);

    if result.show_keyboard {
        request.reply_markup(main_keyboard()).await?;
    } else {
        request.await?;
    }

    Ok(())
}

/// Builds the persistent reply keyboard.
#[must_use]
pub fn main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(
        MAIN_KEYBOARD
            .iter()
            .map(|row| row.iter().map(|&label| KeyboardButton::new(label)).collect::<Vec<_>>()),
    )
    .resize_keyboard()
}
