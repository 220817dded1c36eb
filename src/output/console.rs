//! Console output utilities.

use console::style;

use crate::config::{DownloadScope, SchedulingMode, Target};

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     Timeline Media Downloader                         ║
║     Photos and videos from an account's timeline      ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print the resolved run settings.
pub fn print_run_summary(
    target: &Target,
    scope: &DownloadScope,
    concurrency: usize,
    scheduling: SchedulingMode,
) {
    let categories = match (scope.include_photos(), scope.include_videos()) {
        (true, true) => "photos, videos",
        (true, false) => "photos",
        (false, true) => "videos",
        (false, false) => "none",
    };

    println!();
    println!("{}", style("Configuration:").bold());
    match target {
        Target::Timeline { identity } => {
            println!("  Account:     @{}", identity);
            println!("  Max posts:   {}", scope.scan_limit());
        }
        Target::Post { identity, post_id } => {
            println!("  Account:     @{}", identity);
            println!("  Post:        {}", post_id);
        }
    }
    println!("  Media:       {}", categories);
    if scope.own_posts_only() {
        println!("  Own posts:   only");
    }
    println!("  Concurrency: {} ({})", concurrency, scheduling);
    println!("  Directory:   {}", scope.destination_root().display());
    println!();
}
