mod auth;
mod budget;
mod chat;
mod circle;
mod goal;
pub(crate) mod helpers;
mod settings;
mod summary;
mod transaction;

pub(crate) use auth::{cmd_login, cmd_logout, cmd_register, cmd_whoami};
pub(crate) use budget::{cmd_budget_delete, cmd_budget_set, cmd_budget_show};
pub(crate) use chat::{cmd_chat, cmd_chat_history, cmd_personality, cmd_tip};
pub(crate) use circle::{cmd_circle_challenge, cmd_circle_create, cmd_circle_show};
pub(crate) use goal::{cmd_goal_add, cmd_goal_delete, cmd_goal_fund, cmd_goal_show};
pub(crate) use settings::{cmd_settings_set, cmd_settings_show};
pub(crate) use summary::cmd_summary;
pub(crate) use transaction::{
    cmd_categories, cmd_log, cmd_transaction_delete, cmd_transaction_edit, cmd_transactions,
};
