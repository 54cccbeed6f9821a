use crate::backend::{BackendClient, BackendError, ChatMessage, ChatRole};
use crate::config::Config;
use crate::session::{Credentials, FileTokenStore, TokenStore};
use crate::sync::{
    BotConnectionController, ChatHistoryPoller, ConnectionMonitor, ConnectionState,
    ConnectionStatus, MonitorOptions, Reconciler, StatusPoller, TeardownReason, ViewScope,
};

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const NOT_LOGGED_IN: &str = "Not logged in; run `pairwatch login <email>` first";
const SESSION_REJECTED: &str = "The backend rejected the session; run `pairwatch login <email>` again";

fn backend(config: &Config) -> Result<Arc<BackendClient>> {
    Ok(Arc::new(BackendClient::new(&config.backend)?))
}

fn require_token(credentials: &Credentials) -> Result<String> {
    match credentials.token() {
        Some(token) => Ok(token),
        None => bail!(NOT_LOGGED_IN),
    }
}

/// Turn a 401 into a revoked credential and a login hint.
fn escalate(credentials: &Credentials, err: BackendError) -> anyhow::Error {
    if err.is_unauthorized() {
        credentials.revoke(None);
        anyhow::anyhow!(SESSION_REJECTED)
    } else {
        err.into()
    }
}

// ============================================================================
// Session
// ============================================================================

pub async fn login(config: &Config, email: &str, password: &str) -> Result<()> {
    let resp = backend(config)?.login(email, password).await?;
    FileTokenStore::new(config.token_file()).save(&resp.access_token)?;

    match resp.user.and_then(|u| u.name) {
        Some(name) => println!("Welcome, {name}!"),
        None => println!("Logged in."),
    }
    Ok(())
}

pub async fn register(
    config: &Config,
    name: &str,
    email: &str,
    number: &str,
    password: &str,
) -> Result<()> {
    backend(config)?
        .register_consultant(name, email, number, password)
        .await?;
    println!("Account created; run `pairwatch login {email}` to sign in.");
    Ok(())
}

pub fn logout(config: &Config) {
    FileTokenStore::new(config.token_file()).clear();
    println!("Logged out.");
}

// ============================================================================
// Connection
// ============================================================================

pub async fn status(config: &Config) -> Result<()> {
    let credentials = Credentials::from_config(config);
    require_token(&credentials)?;

    let poller = StatusPoller::new(
        backend(config)?,
        credentials,
        Duration::from_millis(config.sync.poll_interval_ms),
    );
    let scope = ViewScope::new();
    let Some(obs) = poller.poll_once(&scope).await else {
        bail!(SESSION_REJECTED);
    };

    print_state(&ConnectionState::default().apply(&obs));
    Ok(())
}

pub async fn pair(config: &Config) -> Result<()> {
    let controller = BotConnectionController::new(backend(config)?, Credentials::from_config(config));
    controller.request_pairing().await?;
    println!("Pairing requested; run `pairwatch watch` to follow it.");
    Ok(())
}

pub async fn watch(config: &Config, request_pairing: bool) -> Result<()> {
    let backend = backend(config)?;
    let credentials = Credentials::from_config(config);
    require_token(&credentials)?;

    let reconciler = Reconciler::new();
    let mut reader = reconciler.subscribe();
    let handle = ConnectionMonitor::start(
        backend.clone(),
        credentials.clone(),
        &reconciler,
        MonitorOptions::from_config(config),
    )
    .await;

    if request_pairing {
        let controller =
            BotConnectionController::new(backend, credentials).with_scope(handle.scope().clone());
        if let Err(e) = controller.request_pairing().await {
            error!("{}", e);
        }
    }

    print_state(&reader.current());
    loop {
        tokio::select! {
            changed = reader.changed() => match changed {
                Some(state) => print_state(&state),
                None => break,
            },
            _ = handle.closed() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; closing monitor");
                break;
            }
        }
    }

    if handle.stop().await == TeardownReason::Unauthorized {
        bail!(SESSION_REJECTED);
    }
    Ok(())
}

fn print_state(state: &ConnectionState) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match state.status {
        ConnectionStatus::Connected => match state.display_identity() {
            Some(id) => println!("[{now}] {} as {id}", state.status),
            None => println!("[{now}] {}", state.status),
        },
        ConnectionStatus::QrCodeReady => match &state.pairing_artifact {
            Some(code) => println!("[{now}] {} scan to pair: {code}", state.status),
            None => println!("[{now}] {} (waiting for code)", state.status),
        },
        _ => println!("[{now}] {}", state.status),
    }
}

// ============================================================================
// Chats & Contacts
// ============================================================================

pub async fn history(config: &Config, jid: &str) -> Result<()> {
    let credentials = Credentials::from_config(config);
    require_token(&credentials)?;

    let scope = ViewScope::new();
    let (task, mut rx) = ChatHistoryPoller::new(
        backend(config)?,
        credentials,
        Duration::from_millis(config.sync.history_poll_interval_ms),
    )
    .spawn(jid.to_string(), scope.clone());

    let mut printed = 0;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let messages = rx.borrow_and_update().clone();
                // History is append-only in practice; reprint if it shrank.
                if messages.len() < printed {
                    printed = 0;
                }
                for msg in &messages[printed..] {
                    print_message(msg);
                }
                printed = messages.len();
            }
            _ = scope.closed() => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    scope.close(TeardownReason::Stopped);
    if let Err(e) = task.await {
        warn!("Chat history task ended abnormally: {}", e);
    }
    if scope.reason() == Some(TeardownReason::Unauthorized) {
        bail!(SESSION_REJECTED);
    }
    Ok(())
}

fn print_message(msg: &ChatMessage) {
    let who = match msg.role {
        ChatRole::User => "customer",
        ChatRole::Model => "bot",
    };
    println!("{who:>8}: {}", msg.text());
}

pub async fn blacklist(config: &Config) -> Result<()> {
    let credentials = Credentials::from_config(config);
    let token = require_token(&credentials)?;
    let contacts = backend(config)?
        .blacklist(&token)
        .await
        .map_err(|e| escalate(&credentials, e))?;

    if contacts.is_empty() {
        println!("Blacklist is empty.");
    }
    for contact in contacts {
        println!(
            "{:<32} {:<24} since {}",
            contact.jid,
            contact.name,
            contact.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub async fn active_chats(config: &Config) -> Result<()> {
    let credentials = Credentials::from_config(config);
    let token = require_token(&credentials)?;
    let chats = backend(config)?
        .active_chats(&token)
        .await
        .map_err(|e| escalate(&credentials, e))?;

    if chats.is_empty() {
        println!("No active chats.");
    }
    for chat in chats {
        println!(
            "{:<32} last activity {}",
            chat.chat_id,
            chat.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn block(config: &Config, phone: &str, name: &str) -> Result<()> {
    let credentials = Credentials::from_config(config);
    let token = require_token(&credentials)?;
    backend(config)?
        .block_contact(&token, phone, name)
        .await
        .map_err(|e| escalate(&credentials, e))?;
    println!("Blocked {name}.");
    Ok(())
}

pub async fn unblock(config: &Config, jid_or_phone: &str) -> Result<()> {
    let credentials = Credentials::from_config(config);
    let token = require_token(&credentials)?;
    backend(config)?
        .unblock_contact(&token, jid_or_phone)
        .await
        .map_err(|e| escalate(&credentials, e))?;
    println!("Unblocked {jid_or_phone}.");
    Ok(())
}
