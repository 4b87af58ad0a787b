// ============================================================================
// src/ui.rs – console status lines for the CLI
// ============================================================================

use colored::Colorize;

use field_vault::FieldValue;

pub fn banner(title: &str) {
    println!("{}", format!("== {title} ==").bold().cyan());
}

pub fn info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "[+]".green().bold(), msg.green());
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "[!]".yellow().bold(), msg.yellow());
}

pub fn error(msg: &str) {
    eprintln!("{} {}", "[x]".red().bold(), msg.red().bold());
}

/// One row of `list`: name, kind and either the text or a length hint.
pub fn field_row(name: &str, value: &FieldValue) {
    match value {
        FieldValue::Plain(text) => println!(
            "{} {} {}",
            format!("{name:<24}").bold(),
            format!("{:<9}", "plain").dimmed(),
            text
        ),
        FieldValue::Encrypted(code) => println!(
            "{} {} {}",
            format!("{name:<24}").bold(),
            format!("{:<9}", "encrypted").magenta(),
            format!("<{} bytes>", code.len()).dimmed()
        ),
    }
}
