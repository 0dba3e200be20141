//! Synthetic opponent that types a match's word list with human-like
//! timing, errors, and corrections, scaled to the real player's skill.
//! Ported from `original_source/services/bot.py`.
pub mod config;
pub mod planner;
pub mod qwerty;
pub mod simulator;

pub use config::BotConfig;
pub use planner::BotAction;
pub use simulator::{BotHandle, BotResult, BotSimulator};
