//! `history` and `diff` subcommands.

use anyhow::{bail, Context};
use snipvault_core::SnippetService;
use snipvault_history::diff::line_stats;

/// Print the recorded versions of a snippet, oldest first.
pub async fn show_history(service: &SnippetService, id: &str) -> anyhow::Result<()> {
    let snippet = service
        .get(id)
        .await
        .with_context(|| format!("Failed to load snippet {id}"))?;
    let entries = service.history(id).await?;

    if entries.is_empty() {
        println!("{} ({}) has no recorded history", snippet.name, snippet.id);
        return Ok(());
    }

    println!("History of {} ({}):", snippet.name, snippet.id);
    let mut previous = "";
    for entry in &entries {
        let (added, removed) = line_stats(previous, &entry.content);
        println!(
            "  {}  {}  {:<12}  {}  (+{added} -{removed})",
            entry.commit_ref.short(),
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.author,
            entry.message
        );
        previous = &entry.content;
    }
    Ok(())
}

/// Print the change a commit introduced.
pub async fn show_diff(service: &SnippetService, id: &str, commit_ref: &str) -> anyhow::Result<()> {
    match service.diff(id, commit_ref).await? {
        Some(diff) if diff.is_empty() => println!("(no changes)"),
        Some(diff) => print!("{diff}"),
        None => bail!("No commit {commit_ref} in the history of {id}"),
    }
    Ok(())
}
