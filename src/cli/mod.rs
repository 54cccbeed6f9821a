mod commands;

pub use commands::*;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pairwatch",
    version,
    about = "Watch and pair the sales bot's WhatsApp session"
)]
pub struct Cli {
    /// Config file (JSON/JSON5, YAML or TOML).
    #[arg(short, long, global = true)]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session token.
    Login(LoginOpts),
    /// Create a consultant account.
    Register(RegisterOpts),
    /// Forget the stored session token.
    Logout,
    /// Poll the connection status once.
    Status,
    /// Ask the backend to start a new pairing cycle.
    Pair,
    /// Follow the connection state until interrupted.
    Watch(WatchOpts),
    /// Follow one chat's history until interrupted.
    History(HistoryOpts),
    /// Blacklist and active chats.
    Contacts(ContactsOpts),
    Config(ConfigOpts),
    Version,
}

#[derive(clap::Args)]
pub struct LoginOpts {
    pub email: String,
    #[arg(short, long, env = "PAIRWATCH_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Args)]
pub struct RegisterOpts {
    pub name: String,
    pub email: String,
    /// WhatsApp number; punctuation and spaces are stripped.
    pub number: String,
    #[arg(short, long, env = "PAIRWATCH_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(clap::Args)]
pub struct WatchOpts {
    /// Request a pairing cycle once the monitor is running.
    #[arg(long)]
    pub pair: bool,
}

#[derive(clap::Args)]
pub struct HistoryOpts {
    /// Chat JID, e.g. 5511999999999@s.whatsapp.net
    pub jid: String,
}

#[derive(clap::Args)]
pub struct ContactsOpts {
    #[command(subcommand)]
    pub action: ContactsAction,
}

#[derive(Subcommand)]
pub enum ContactsAction {
    Blacklist,
    Chats,
    Block { phone: String, name: String },
    Unblock { jid_or_phone: String },
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}
