use crate::error::AppError;
use crate::pools::{FetchState, PoolEntry};
use crate::state::AppState;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PoolListItem {
    pub index: usize,
    pub command: String,
    pub status_page: Option<String>,
}

/// Downloads the pool list, retrying up to `retries` times once each cooldown has passed.
pub async fn fetch_pools(state: &AppState, retries: u32) -> Result<Vec<PoolEntry>, AppError> {
    tracing::info!("Fetching pool list from {}", state.pools.source().url());
    state.pools.request_fetch();
    let mut attempts_left = retries;
    loop {
        match state.pools.wait_settled().await {
            FetchState::Succeeded(entries) => return Ok(entries),
            FetchState::Failed(reason) if attempts_left > 0 => {
                attempts_left -= 1;
                let wait = state.pools.cooldown_remaining();
                tracing::warn!("{reason}; retrying in {} ms", wait.as_millis());
                tokio::time::sleep(wait).await;
                state.pools.request_retry()?;
            }
            FetchState::Failed(reason) => return Err(AppError::NetworkFailure(reason)),
            FetchState::Idle | FetchState::InFlight => {
                state.pools.request_fetch();
            }
        }
    }
}

pub fn list_items(entries: &[PoolEntry]) -> Vec<PoolListItem> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| PoolListItem {
            index,
            command: entry.to_string(),
            status_page: entry.status_page_url().map(|url| url.to_string()),
        })
        .collect()
}

/// `pools`: print the available pools.
pub async fn list_pools(state: &AppState, json: bool, retries: u32) -> Result<(), AppError> {
    let entries = fetch_pools(state, retries).await?;
    let items = list_items(&entries);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("No pools available, try again later");
        return Ok(());
    }
    for item in &items {
        match &item.status_page {
            Some(page) => println!("[{}] {}  ({page})", item.index, item.command),
            None => println!("[{}] {}", item.index, item.command),
        }
    }
    Ok(())
}
