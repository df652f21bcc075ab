//! Organiser notification worker.
//!
//! Vote notices are queued by the message handlers and delivered by a
//! single background task:
//! 1. Wait for the rate limiter
//! 2. Send the notice to the organiser chat
//! 3. On a flood wait, back off and retry once
//! 4. Any other failure is logged and the notice dropped
//!
//! A lost notice never affects the vote it describes.

use std::future::Future;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode, UserId};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{RateLimiter, TelegramError};

/// Capacity of the notice queue.
const QUEUE_CAPACITY: usize = 64;

/// Messages that can be sent to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierMessage {
    /// Deliver an HTML notice to the organiser.
    Notify(String),
    /// Stop the notifier.
    Shutdown,
}

/// Destination of organiser notices.
pub trait NoticeSink: Send + Sync {
    /// Sends one HTML-formatted notice.
    fn send_notice(&self, text: &str) -> impl Future<Output = Result<(), TelegramError>> + Send;
}

/// Private chat with the organiser.
#[derive(Debug, Clone)]
pub struct AdminChat {
    bot: Bot,
    chat_id: ChatId,
}

impl AdminChat {
    /// Creates a sink for the organiser with the given user id.
    #[must_use]
    pub fn new(bot: Bot, admin_id: u64) -> Self {
        Self {
            bot,
            chat_id: ChatId::from(UserId(admin_id)),
        }
    }
}

impl NoticeSink for AdminChat {
    async fn send_notice(&self, text: &str) -> Result<(), TelegramError> {
        self.bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

/// Sending side of the notice queue, cloned into every handler.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<NotifierMessage>,
}

impl NotifierHandle {
    /// Queues a notice without waiting.
    pub fn notify(&self, text: impl Into<String>) -> Result<(), TelegramError> {
        self.tx
            .try_send(NotifierMessage::Notify(text.into()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => TelegramError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => TelegramError::QueueClosed,
            })
    }

    /// Asks the notifier to stop after the notices already queued.
    pub async fn shutdown(&self) {
        if self.tx.send(NotifierMessage::Shutdown).await.is_err() {
            debug!("Notifier already stopped");
        }
    }
}

/// Creates the queue feeding an [`AdminNotifier`].
#[must_use]
pub fn notice_channel() -> (NotifierHandle, mpsc::Receiver<NotifierMessage>) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    (NotifierHandle { tx }, rx)
}

/// Delivers queued notices to the organiser one at a time.
pub struct AdminNotifier<S> {
    /// Where notices go.
    sink: S,

    /// Spacing between consecutive notices.
    rate_limiter: RateLimiter,
}

impl<S: NoticeSink> AdminNotifier<S> {
    /// Creates a new notifier.
    #[must_use]
    pub fn new(sink: S, min_interval: Duration) -> Self {
        Self {
            sink,
            rate_limiter: RateLimiter::new(min_interval),
        }
    }

    /// Runs the notifier loop until shutdown or until every handle is gone.
    pub async fn run(&self, mut rx: mpsc::Receiver<NotifierMessage>) {
        info!("Admin notifier started");

        while let Some(message) = rx.recv().await {
            match message {
                NotifierMessage::Notify(text) => self.deliver(&text).await,
                NotifierMessage::Shutdown => break,
            }
        }

        info!("Admin notifier shutting down");
    }

    /// Sends one notice, retrying once after a flood wait.
    async fn deliver(&self, text: &str) {
        self.rate_limiter.wait_and_acquire().await;

        let outcome = match self.sink.send_notice(text).await {
            Err(TelegramError::FloodWait(wait)) => {
                self.rate_limiter.back_off(wait).await;
                self.sink.send_notice(text).await
            }
            other => other,
        };

        match outcome {
            Ok(()) => debug!("Admin notice delivered"),
            Err(e @ TelegramError::FloodWait(_)) => warn!("Dropping admin notice: {}", e),
            Err(e) => error!("Failed to notify admin: {}", e),
        }
    }
}

impl<S> std::fmt::Debug for AdminNotifier<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminNotifier")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records notices and fails on demand.
    #[derive(Default, Clone)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<String>>>,
        failures: Arc<Mutex<Vec<TelegramError>>>,
    }

    impl NoticeSink for RecordingSink {
        async fn send_notice(&self, text: &str) -> Result<(), TelegramError> {
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }
            self.sent.lock().unwrap().push(text.to_owned());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order_until_shutdown() {
        let sink = RecordingSink::default();
        let notifier = AdminNotifier::new(sink.clone(), Duration::ZERO);
        let (handle, rx) = notice_channel();

        handle.notify("first").unwrap();
        handle.notify("second").unwrap();
        handle.shutdown().await;
        notifier.run(rx).await;

        assert_eq!(*sink.sent.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failure_is_dropped_and_loop_continues() {
        let sink = RecordingSink::default();
        sink.failures.lock().unwrap().push(TelegramError::QueueClosed);
        let notifier = AdminNotifier::new(sink.clone(), Duration::ZERO);
        let (handle, rx) = notice_channel();

        handle.notify("lost").unwrap();
        handle.notify("kept").unwrap();
        drop(handle);
        notifier.run(rx).await;

        assert_eq!(*sink.sent.lock().unwrap(), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_flood_wait_is_retried() {
        let sink = RecordingSink::default();
        sink.failures
            .lock()
            .unwrap()
            .push(TelegramError::FloodWait(Duration::from_millis(1)));
        let notifier = AdminNotifier::new(sink.clone(), Duration::ZERO);
        let (handle, rx) = notice_channel();

        handle.notify("retried").unwrap();
        drop(handle);
        notifier.run(rx).await;

        assert_eq!(*sink.sent.lock().unwrap(), vec!["retried"]);
    }

    #[tokio::test]
    async fn test_notify_after_stop_fails() {
        let (handle, rx) = notice_channel();
        drop(rx);

        assert!(matches!(
            handle.notify("nobody listens"),
            Err(TelegramError::QueueClosed)
        ));
    }
}
