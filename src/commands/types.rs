//! Command types and definitions.

use std::fmt;

/// Reply keyboard button that shows the top samples.
pub const BUTTON_RESULTS: &str = "📊 Результаты";

/// Reply keyboard button that shows the help text.
pub const BUTTON_HELP: &str = "ℹ️ Помощь";

/// Reply keyboard button that shows the main menu.
pub const BUTTON_MENU: &str = "🔄 Меню";

/// Reply keyboard button that shows full statistics (organiser only).
pub const BUTTON_STATS: &str = "📈 Статистика";

/// Layout of the main reply keyboard, row by row.
pub const MAIN_KEYBOARD: [[&str; 2]; 2] = [[BUTTON_RESULTS, BUTTON_HELP], [BUTTON_MENU, BUTTON_STATS]];

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Show the greeting with the user's vote budget.
    Menu,

    /// Show how to vote.
    Help,

    /// Show the leading samples.
    Results,

    /// Show the full per-sample statistics (organiser only).
    Stats,

    /// Any other text, treated as a ballot.
    Vote(String),
}

impl BotCommand {
    /// Parses a message text into a command.
    ///
    /// Slash commands may carry a `@botname` suffix and are matched
    /// case-insensitively. Returns `None` for unknown slash commands and
    /// blank messages.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        if text.is_empty() {
            return None;
        }

        match text {
            BUTTON_RESULTS => return Some(Self::Results),
            BUTTON_HELP => return Some(Self::Help),
            BUTTON_MENU => return Some(Self::Menu),
            BUTTON_STATS => return Some(Self::Stats),
            _ => {}
        }

        let Some(after_slash) = text.strip_prefix('/') else {
            return Some(Self::Vote(text.to_owned()));
        };

        // "/stats@honey_bot extra" -> "stats"
        let word = after_slash
            .split_whitespace()
            .next()
            .unwrap_or_default();
        let name = word.split_once('@').map_or(word, |(name, _)| name);

        match name.to_lowercase().as_str() {
            "start" | "menu" => Some(Self::Menu),
            "help" => Some(Self::Help),
            "results" | "top" => Some(Self::Results),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Help => "help",
            Self::Results => "results",
            Self::Stats => "stats",
            Self::Vote(_) => "vote",
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vote(text) => write!(f, "vote {text:?}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// HTML-formatted reply for the user.
    pub message: String,

    /// Whether to attach the main reply keyboard.
    pub show_keyboard: bool,

    /// HTML-formatted notice for the organiser, if any.
    pub admin_notice: Option<String>,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            show_keyboard: false,
            admin_notice: None,
        }
    }

    /// Creates a successful result that attaches the main keyboard.
    #[must_use]
    pub fn success_with_keyboard(message: impl Into<String>) -> Self {
        Self {
            show_keyboard: true,
            ..Self::success(message)
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(message)
        }
    }

    /// Attaches a notice for the organiser.
    #[must_use]
    pub fn with_admin_notice(mut self, notice: impl Into<String>) -> Self {
        self.admin_notice = Some(notice.into());
        self
    }
}
