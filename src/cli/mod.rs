//! CLI interface for admin-session

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "admin-session")]
#[command(version)]
#[command(about = "Sign in to the admin dashboard API and manage the local session", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an admin-session.toml configuration file
    Init,

    /// Sign in and store the session
    Login {
        /// Account email (prompted for when omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Account password (prompted for when omitted)
        #[arg(long, env = "ADMIN_SESSION_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and wipe stored credentials
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,

        /// Re-fetch the profile from the API first
        #[arg(short, long)]
        refresh: bool,
    },

    /// Show the local session state without contacting the API
    Status,

    /// Move credentials left by older clients into the session store
    Migrate,

    /// Reset a forgotten password
    ResetPassword {
        /// Account email (prompted for when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// List dashboard users
    Users {
        /// Free-text search over names and email
        #[arg(short, long)]
        search: Option<String>,

        /// Only users with this role
        #[arg(short, long)]
        role: Option<String>,

        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Rows per page
        #[arg(long, default_value = "10")]
        page_size: usize,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Block until the session is ended elsewhere
    Watch,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}
