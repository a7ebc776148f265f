//! CLI output formatting utilities

use colored::Colorize;

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

/// Describe the configured signing mode
pub fn format_mode(asymmetric: bool) -> String {
    if asymmetric {
        "RS256 (asymmetric)".cyan().to_string()
    } else {
        "HS256 (shared secret)".cyan().to_string()
    }
}
