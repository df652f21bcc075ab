//! Command handler implementation.

use std::fmt::Write as _;
use std::sync::Arc;

use teloxide::utils::html;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::types::{BUTTON_RESULTS, BUTTON_STATS, BotCommand, CommandResult};
use crate::config::BeekeeperDirectory;
use crate::ledger::{VoteError, VoteLedger, VoteReceipt, VoterId};

/// Medals for the first places of the results view.
const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

/// Medal for every place after the podium.
const RUNNER_UP_MEDAL: &str = "🏅";

/// Turns chat messages into ledger operations and renders the replies.
pub struct CommandHandler {
    /// Shared vote ledger.
    ledger: Arc<RwLock<VoteLedger>>,

    /// Beekeeper contacts shown after a vote.
    directory: BeekeeperDirectory,

    /// Telegram user id of the organiser.
    admin_id: VoterId,

    /// Number of samples in the results view.
    top_n: usize,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        ledger: Arc<RwLock<VoteLedger>>,
        directory: BeekeeperDirectory,
        admin_id: VoterId,
        top_n: usize,
    ) -> Self {
        Self {
            ledger,
            directory,
            admin_id,
            top_n,
        }
    }

    /// Parses and executes a message from `user`.
    ///
    /// Returns `None` if the message is not something the bot answers.
    pub async fn handle(&self, user: VoterId, message_text: &str) -> Option<CommandResult> {
        let command = BotCommand::parse(message_text)?;

        debug!("Handling {} from user {}", command, user);
        let result = self.execute(user, command).await;
        debug!(
            "Command result: success={}, admin_notice={}",
            result.success,
            result.admin_notice.is_some()
        );

        Some(result)
    }

    /// Executes a parsed command.
    async fn execute(&self, user: VoterId, command: BotCommand) -> CommandResult {
        match command {
            BotCommand::Menu => self.handle_menu(user).await,
            BotCommand::Help => self.handle_help().await,
            BotCommand::Results => self.handle_results(user).await,
            BotCommand::Stats => self.handle_stats(user).await,
            BotCommand::Vote(text) => self.handle_vote(user, &text).await,
        }
    }

    /// Checks whether `user` is the organiser.
    #[must_use]
    pub const fn is_admin(&self, user: VoterId) -> bool {
        user == self.admin_id
    }

    async fn handle_menu(&self, user: VoterId) -> CommandResult {
        let ledger = self.ledger.read().await;
        let rules = ledger.rules();
        let used = ledger.votes_cast_by(user);
        let remaining = ledger.remaining_votes(user);

        let message = format!(
            "🍯 <b>Конкурс мёда!</b>\n\n\
             👤 Ваши голоса: {used}/{limit} (осталось: <b>{remaining}</b>)\n\n\
             💡 <b>Напишите номер мёда (1–{max}):</b>\n\
             • Сканируйте QR-код баночки\n\
             • Введите номер\n\
             • Получите контакты пчеловода\n\n\
             <b>Примеры:</b> <code>5</code>, <code>42</code>, <code>{max}</code>, <code>Мёд 3</code>",
            limit = rules.vote_limit,
            max = rules.max_samples,
        );

        CommandResult::success_with_keyboard(message)
    }

    async fn handle_help(&self) -> CommandResult {
        let limit = self.ledger.read().await.rules().vote_limit;

        let message = format!(
            "ℹ️ <b>Как голосовать:</b>\n\n\
             1️⃣ Сканируйте QR-код на баночке\n\
             2️⃣ Напишите номер мёда (можно просто число, можно <code>Мёд 3</code>)\n\
             3️⃣ У вас максимум {limit} голосов\n\
             4️⃣ Сразу после голоса получите контакты пчеловода\n\n\
             <b>Команды:</b>\n\
             /start или /menu — главное меню\n\
             {BUTTON_RESULTS} — ТОП-{top}\n\
             /stats или {BUTTON_STATS} — полная статистика (только для организатора)",
            top = self.top_n,
        );

        CommandResult::success_with_keyboard(message)
    }

    async fn handle_vote(&self, user: VoterId, text: &str) -> CommandResult {
        // Held across validate, count and save so concurrent ballots from the
        // same user cannot both pass the limit check.
        let outcome = {
            let mut ledger = self.ledger.write().await;
            ledger.cast_vote(user, text)
        };

        match outcome {
            Ok(receipt) => self.render_accepted(user, &receipt),
            Err(e) => {
                info!("Rejected ballot from user {}: {}", user, e);
                let max = self.ledger.read().await.rules().max_samples;
                CommandResult::error(render_rejection(&e, max))
            }
        }
    }

    fn render_accepted(&self, user: VoterId, receipt: &VoteReceipt) -> CommandResult {
        let contact = html::escape(self.directory.lookup(receipt.sample));

        let message = format!(
            "✅ <b>Голос за Мёд №{sample} принят!</b>\n\n\
             👤 Осталось голосов: <b>{remaining}</b>\n\n\
             {contact}\n\n\
             ➡️ Можете ввести следующий номер мёда.",
            sample = receipt.sample,
            remaining = receipt.remaining,
        );

        let notice = format!(
            "🗳️ <b>Новый голос!</b>\n\
             Мёд №{sample}\n\
             Всего голосов за него: <b>{total}</b>\n\
             Пользователь: <code>{user}</code>\n\
             Время: {time}",
            sample = receipt.sample,
            total = receipt.sample_total,
            time = chrono::Local::now().format("%H:%M:%S"),
        );

        CommandResult::success(message).with_admin_notice(notice)
    }

    async fn handle_results(&self, user: VoterId) -> CommandResult {
        let ledger = self.ledger.read().await;
        let top = ledger.top_n(self.top_n);

        let mut message = format!("📊 <b>ТОП-{}:</b>\n\n", self.top_n);
        for (place, (sample, count)) in top.iter().enumerate() {
            let medal = MEDALS.get(place).copied().unwrap_or(RUNNER_UP_MEDAL);
            let _ = writeln!(message, "{medal} Мёд №{sample}: <b>{count}</b> голосов");
        }

        if self.is_admin(user) {
            let _ = write!(
                message,
                "\n👥 Уникальных голосующих: {}",
                ledger.unique_voter_count()
            );
        }

        CommandResult::success(message)
    }

    async fn handle_stats(&self, user: VoterId) -> CommandResult {
        if !self.is_admin(user) {
            info!("User {} asked for full statistics", user);
            return CommandResult::error("❌ Команда только для организатора.");
        }

        let ledger = self.ledger.read().await;

        let mut message = "📈 <b>ПОЛНАЯ СТАТИСТИКА:</b>\n\n".to_owned();
        for (sample, count) in ledger.full_dump().into_iter().filter(|&(_, c)| c > 0) {
            let _ = writeln!(message, "Мёд №{sample}: {count}");
        }
        let _ = write!(
            message,
            "\n👥 Уникальных голосующих: {}",
            ledger.unique_voter_count()
        );

        CommandResult::success(message)
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("admin_id", &self.admin_id)
            .field("top_n", &self.top_n)
            .finish_non_exhaustive()
    }
}

/// Renders the user-facing text for a rejected ballot.
fn render_rejection(error: &VoteError, max_samples: u32) -> String {
    match error {
        VoteError::NoNumberFound => {
            format!("❌ Напишите номер мёда (число от 1 до {max_samples}).")
        }
        VoteError::SampleOutOfRange { max, .. } => {
            format!("❌ Номер мёда должен быть от 1 до {max}.")
        }
        VoteError::VoteLimitExceeded { limit } => {
            format!("❌ Лимит голосов исчерпан. Вы уже отдали {limit} голосов.")
        }
    }
}
