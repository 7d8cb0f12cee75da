use std::sync::Arc;

use muse_core::{Creation, CreationStore, FeedLoader, FeedSource, Reveal};

use crate::commands::common::{creation_to_list_item, format_creation_lines, ApiSettings};
use crate::error::CliError;

pub async fn run_feed(settings: &ApiSettings, more: usize, as_json: bool) -> Result<(), CliError> {
    let creations = load(settings, FeedSource::Published).await?;
    let reveal = reveal_pages(creations.len(), more);
    let visible = reveal.visible(&creations);

    print_creations(visible, settings.user_id.as_deref(), as_json)?;
    if !as_json && reveal.has_more() {
        println!(
            "Showing {} of {}. Use --more {} to see more.",
            reveal.visible_count(),
            reveal.total(),
            more + 1
        );
    }
    Ok(())
}

pub async fn run_mine(settings: &ApiSettings, as_json: bool) -> Result<(), CliError> {
    let creations = load(settings, FeedSource::Own).await?;
    if creations.is_empty() && !as_json {
        println!("No creations yet.");
        return Ok(());
    }
    print_creations(&creations, settings.user_id.as_deref(), as_json)
}

/// Initial page plus `more` reveal steps
pub fn reveal_pages(total: usize, more: usize) -> Reveal {
    let mut reveal = Reveal::new(total);
    for _ in 0..more {
        if !reveal.reveal_more() {
            break;
        }
    }
    reveal
}

async fn load(settings: &ApiSettings, source: FeedSource) -> Result<Vec<Creation>, CliError> {
    let store = CreationStore::new();
    let mut loader = FeedLoader::new(Arc::new(settings.client()?), store.clone(), source);
    let count = loader.load().await?;
    tracing::debug!(?source, count, "Loaded creations");
    Ok(store.snapshot().await)
}

fn print_creations(
    creations: &[Creation],
    viewer: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    if as_json {
        let items = creations
            .iter()
            .map(|creation| creation_to_list_item(creation, viewer))
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_creation_lines(creations, viewer) {
            println!("{line}");
        }
    }
    Ok(())
}
