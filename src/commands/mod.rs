//! Command handling module.
//!
//! Routes chat messages (slash commands, keyboard buttons and free-text
//! ballots) to the vote ledger and renders the HTML replies.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{
    BUTTON_HELP, BUTTON_MENU, BUTTON_RESULTS, BUTTON_STATS, BotCommand, CommandResult,
    MAIN_KEYBOARD,
};
