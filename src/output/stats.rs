//! Statistics reporting.

use console::style;

use crate::download::state::{DownloadSummary, TimelineMediaResult};

/// Print what a walk found.
pub fn print_walk_result(result: &TimelineMediaResult) {
    let photos = result
        .tasks
        .iter()
        .filter(|task| !task.kind().is_video_like())
        .count();
    let videos = result.tasks.len() - photos;

    println!();
    println!(
        "Scanned {} posts: {} photos, {} videos{}",
        result.scanned_posts,
        style(photos).green(),
        style(videos).green(),
        if result.reached_post_limit {
            style(" (post limit reached)").yellow().to_string()
        } else {
            String::new()
        }
    );
}

/// Print the outcome of a download run, including every failure.
pub fn print_download_summary(summary: &DownloadSummary) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Download Summary:").bold());
    println!("  Saved:    {}", style(summary.succeeded).green());
    println!("  Skipped:  {} (already on disk)", style(summary.skipped).yellow());
    if summary.failed > 0 {
        println!("  Failed:   {}", style(summary.failed).red());
    } else {
        println!("  Failed:   0");
    }
    println!("  Total:    {}", summary.total);

    if summary.has_failures() {
        println!();
        println!("{}", style("Failures:").bold());
        for failure in &summary.failures {
            println!("  {} {}", style(&failure.task_id).dim(), failure.reason);
        }
    }

    if summary.cancelled {
        println!();
        println!(
            "{}",
            style("Run cancelled; remaining items were not started.").yellow()
        );
    }
    println!("{}", style("═".repeat(50)).dim());
}
