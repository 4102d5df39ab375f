//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::session::{AuthStatus, Session, User};
use crate::table::Page;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Format an auth status as a colored string
pub fn format_status(status: AuthStatus) -> String {
    match status {
        AuthStatus::Authenticated => status.to_string().green().to_string(),
        AuthStatus::Unauthenticated => status.to_string().red().to_string(),
        AuthStatus::Idle => status.to_string().yellow().to_string(),
    }
}

/// Print the signed-in user
pub fn print_user_detail(user: &User) {
    println!("{}", "Signed In".bold().underline());
    println!();
    println!("  {} {}", "Name:".bold(), display_name(user));
    println!("  {} {}", "Email:".bold(), user.email);
    println!("  {} {}", "Role:".bold(), user.role.to_string().cyan());

    let verified = if user.is_email_verified {
        "yes".green()
    } else {
        "no".red()
    };
    println!("  {} {}", "Verified:".bold(), verified);

    if !user.has_updated_password {
        println!(
            "  {}",
            "Password has not been changed since the account was created".yellow()
        );
    }

    if !user.permissions.is_empty() {
        println!();
        println!("  {}", "Permissions:".bold());
        for permission in &user.permissions {
            println!("    - {}", permission);
        }
    }
}

/// Print local session state
pub fn print_session_status(session: &Session) {
    println!("{}", "Session".bold().underline());
    println!();
    println!("  {} {}", "Status:".bold(), format_status(session.auth_status));

    if let Some(user) = &session.user {
        println!("  {} {} <{}>", "User:".bold(), display_name(user), user.email);
    }
    if let Some(role) = session.role {
        println!("  {} {}", "Role:".bold(), role);
    }
    if let Some(expiry) = session.token_expiry {
        let label = if expiry <= chrono::Utc::now() {
            "expired".red()
        } else {
            "valid".green()
        };
        println!(
            "  {} {} ({})",
            "Expires:".bold(),
            expiry.format("%Y-%m-%d %H:%M:%S UTC"),
            label
        );
    }
}

/// Print a page of users
pub fn print_user_table(page: &Page<&User>) {
    if page.items.is_empty() {
        info("No users match the query");
        if page.total_items > 0 {
            info(&format!(
                "Page {} is past the end ({} pages)",
                page.page, page.total_pages
            ));
        }
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Email").fg(Color::Cyan),
            Cell::new("Role").fg(Color::Cyan),
            Cell::new("Verified").fg(Color::Cyan),
        ]);

    for user in &page.items {
        let (verified, verified_color) = if user.is_email_verified {
            ("yes", Color::Green)
        } else {
            ("no", Color::Red)
        };
        table.add_row(vec![
            Cell::new(display_name(user)),
            Cell::new(&user.email),
            Cell::new(user.role.to_string()),
            Cell::new(verified).fg(verified_color),
        ]);
    }

    println!("{table}");
    println!(
        "Page {} of {} ({} users)",
        page.page, page.total_pages, page.total_items
    );
}

fn display_name(user: &User) -> &str {
    if user.full_name.is_empty() {
        &user.email
    } else {
        &user.full_name
    }
}
