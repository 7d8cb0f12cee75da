use std::sync::Arc;

use muse_core::likes::NoticeLevel;
use muse_core::{Creation, CreationId, CreationStore, LikeSynchronizer, MuseClient, Notice};

use crate::commands::common::{parse_creation_id, ApiSettings};
use crate::error::CliError;

pub async fn run_like(settings: &ApiSettings, raw_id: &str) -> Result<(), CliError> {
    let id = parse_creation_id(raw_id)?;
    let user_id = settings.require_user_id()?;
    let client = Arc::new(settings.client()?);

    let store = CreationStore::with_creations(visible_creations(&client, &id).await?);
    let synchronizer = LikeSynchronizer::with_transport(store.clone(), client);

    let result = synchronizer.toggle(id, user_id).await;
    for line in notice_lines(&synchronizer.drain_notices().await) {
        eprintln!("{line}");
    }

    if let Some(creation) = store.get(&id).await {
        let state = if creation.is_liked_by(user_id) {
            "liked"
        } else {
            "not liked"
        };
        println!("{id}: {state} ({} likes)", creation.like_count());
    }
    result.map(|_| ()).map_err(|_| CliError::LikeNotApplied)
}

/// Published creations, plus the caller's own if `id` is not among them
async fn visible_creations(
    client: &MuseClient,
    id: &CreationId,
) -> Result<Vec<Creation>, CliError> {
    let mut creations = client.fetch_published().await?;
    if !creations.iter().any(|creation| creation.id == *id) {
        let own = client.fetch_own().await?;
        creations.extend(own.into_iter().filter(|creation| !creation.publish));
    }
    Ok(creations)
}

pub fn notice_lines(notices: &[Notice]) -> Vec<String> {
    notices
        .iter()
        .map(|notice| {
            let label = match notice.level {
                NoticeLevel::Error => "error",
            };
            format!("{label}: {}", notice.message)
        })
        .collect()
}
