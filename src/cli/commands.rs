//! CLI command implementations

use anyhow::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::cli::{
    error, info, print_session_status, print_user_detail, print_user_table, success, warn,
    OutputFormat,
};
use crate::config::{self, loader::CONFIG_FILENAME, Config};
use crate::guard::{GuardState, SessionGuard};
use crate::reset::{PasswordReset, ResetStep};
use crate::session::{SessionStore, SharedSession};
use crate::storage::Storage;
use crate::table::TableQuery;

/// Create a new admin-session.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    let content = config::loader::default_config_content();
    fs::write(config_path, content)?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Set api.base_url and run 'admin-session login'");

    Ok(())
}

/// Sign in
pub async fn login(email: Option<String>, password: Option<String>) -> Result<()> {
    let (config, session) = open_session()?;
    let theme = ColorfulTheme::default();

    let email = match email {
        Some(email) => email,
        None => Input::<String>::with_theme(&theme)
            .with_prompt("Email")
            .interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => Password::with_theme(&theme)
            .with_prompt("Password")
            .interact()?,
    };

    let service = AuthService::new(ApiClient::new(&config.api)?, session);
    let pb = spinner("Signing in...");
    let result = service.login(&email, &password).await;
    pb.finish_and_clear();

    match result {
        Ok(user) => {
            success(&format!("Signed in as {} ({})", user.email, user.role));
            if !user.has_updated_password {
                warn("This account still uses its initial password. Consider changing it.");
            }
            Ok(())
        }
        Err(e) => {
            error(&format!("Login failed: {}", e));
            Err(e.into())
        }
    }
}

/// Sign out
pub async fn logout() -> Result<()> {
    let (config, session) = open_session()?;
    let service = AuthService::new(ApiClient::new(&config.api)?, session);
    service.logout().await;
    success("Signed out");
    Ok(())
}

/// Show the signed-in user
pub async fn whoami(format: OutputFormat, refresh: bool) -> Result<()> {
    let (config, session) = open_session()?;
    let mut guard = require_session(&config, session.clone()).await?;

    let user = if refresh {
        let service = AuthService::new(ApiClient::new(&config.api)?, session);
        service.refresh_profile().await?
    } else {
        let user = guard
            .protect(|session| async move { session.read().await.user().cloned() })
            .await
            .flatten();
        match user {
            Some(user) => user,
            None => anyhow::bail!("Session ended while reading it"),
        }
    };

    match format {
        OutputFormat::Table => print_user_detail(&user),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&user)?),
    }

    Ok(())
}

/// Show the local session state
pub async fn status() -> Result<()> {
    let (_, session) = open_session()?;
    let store = session.read().await;
    print_session_status(store.session());
    Ok(())
}

/// Adopt credentials from the durable store
pub async fn migrate() -> Result<()> {
    let config = config::load_config_or_default()?;
    let storage = Storage::from_config(&config.storage)?;
    let mut store = SessionStore::new(storage, &config.session);

    store.restore_session();
    if store.migrate_legacy_storage() {
        let email = store.user().map(|u| u.email.clone()).unwrap_or_default();
        success(&format!("Migrated stored login for {}", email));
    } else {
        info("Nothing to migrate");
    }
    Ok(())
}

/// Interactive password reset
pub async fn reset_password(email: Option<String>) -> Result<()> {
    let config = config::load_config_or_default()?;
    let theme = ColorfulTheme::default();
    let mut wizard = PasswordReset::new(ApiClient::new(&config.api)?);
    let mut email = email;

    loop {
        let outcome = match wizard.step() {
            ResetStep::Initial => {
                let address = match email.take() {
                    Some(address) => address,
                    None => Input::<String>::with_theme(&theme)
                        .with_prompt("Account email")
                        .interact_text()?,
                };
                let result = wizard.request_token(&address).await;
                if result.is_ok() {
                    success(&format!("Reset token sent to {}", address));
                }
                result
            }
            ResetStep::TokenGenerated => {
                let token: String = Input::with_theme(&theme)
                    .with_prompt("Token from the email (leave empty to resend)")
                    .allow_empty(true)
                    .interact_text()?;
                if token.trim().is_empty() {
                    let result = wizard.resend_token().await;
                    if result.is_ok() {
                        info("Token re-sent");
                    }
                    result
                } else {
                    wizard.confirm_token(&token).await
                }
            }
            ResetStep::TokenConfirmed => {
                let password = Password::with_theme(&theme)
                    .with_prompt("New password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()?;
                wizard.complete(&password, &password).await
            }
            ResetStep::Completed => break,
        };

        if let Err(e) = outcome {
            error(&e.to_string());
            let retry = Confirm::with_theme(&theme)
                .with_prompt("Try again?")
                .default(true)
                .interact()?;
            if !retry {
                return Err(e.into());
            }
        }
    }

    success("Password changed. Sign in with 'admin-session login'");
    Ok(())
}

/// List dashboard users
pub async fn users(
    search: Option<String>,
    role: Option<String>,
    page: usize,
    page_size: usize,
    format: OutputFormat,
) -> Result<()> {
    let (config, session) = open_session()?;
    require_session(&config, session.clone()).await?;

    let service = AuthService::new(ApiClient::new(&config.api)?, session);
    let pb = spinner("Fetching users...");
    let result = service.list_users().await;
    pb.finish_and_clear();
    let all_users = result?;

    let mut query = TableQuery::default().with_page(page, page_size);
    if let Some(search) = search {
        query = query.with_search(search);
    }
    if let Some(role) = role {
        query = query.with_filter("role", role);
    }
    let results = query.apply(&all_users);

    match format {
        OutputFormat::Table => print_user_table(&results),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&results)?),
    }

    Ok(())
}

/// Block until the session is ended by another process
pub async fn watch() -> Result<()> {
    let (config, session) = open_session()?;
    let mut guard = require_session(&config, session).await?;

    info("Watching session; press Ctrl+C to stop");
    tokio::select! {
        state = guard.watch() => {
            if let GuardState::Redirecting { to } = state {
                warn(&format!("Session ended elsewhere, sign in again ({})", to));
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            info("Stopped watching");
        }
    }
    Ok(())
}

// Helper functions

/// Load config and restore the session from storage
fn open_session() -> Result<(Config, SharedSession)> {
    let config = config::load_config_or_default()?;
    let storage = Storage::from_config(&config.storage)?;
    let session = SessionStore::bootstrap_shared(storage, &config.session);
    Ok((config, session))
}

/// Run the session guard, failing with a login hint when it redirects
async fn require_session(config: &Config, session: SharedSession) -> Result<SessionGuard> {
    let mut guard = SessionGuard::new(session, config.guard.clone());

    let pb = spinner("Checking session...");
    let state = guard.activate().await.clone();
    pb.finish_and_clear();

    match state {
        GuardState::Authorized => Ok(guard),
        GuardState::Redirecting { to } => {
            let reason = guard
                .rejection()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "session invalid".to_string());
            warn(&format!("Not signed in: {}", reason));
            info(&format!(
                "Run {} to continue ({})",
                "admin-session login".cyan(),
                to
            ));
            anyhow::bail!("login required")
        }
        GuardState::Checking => anyhow::bail!("session check did not finish"),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
