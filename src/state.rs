use crate::config::Config;
use crate::error::AppError;
use crate::miner::{MinerSupervisor, SupervisorEvent};
use crate::pools::{HttpPoolSource, PoolListFetcher};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;

/// Shared application state: one pool fetcher and one miner supervisor.
pub struct AppState {
    pub pools: PoolListFetcher<HttpPoolSource>,
    pub miner: MinerSupervisor,
    miner_events: Mutex<Option<UnboundedReceiver<SupervisorEvent>>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let pools = PoolListFetcher::new(&config.pools)?;
        let (miner, events) = MinerSupervisor::new(config.miner);
        Ok(Self {
            pools,
            miner,
            miner_events: Mutex::new(Some(events)),
        })
    }

    /// Hands out the miner event stream. Only the first caller gets it.
    pub fn take_miner_events(&self) -> Option<UnboundedReceiver<SupervisorEvent>> {
        self.miner_events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}
