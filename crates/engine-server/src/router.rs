//! Order router: asset id → asset actor.
//!
//! Actors are created lazily on the first order for an asset. Creation
//! goes through `DashMap::entry`, so two racing first orders for the same
//! asset always land in the same actor.
//!
//! The shard guard is never held across an `.await`; handles are cloned
//! out of the map before talking to the actor.

use std::sync::Arc;

use dashmap::DashMap;
use engine_core::{BookDepth, BookSnapshot, EngineError, Matcher, Order, PriceTimeMatcher};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::asset_task::AssetHandle;
use crate::types::TradeTx;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("order rejected: {0}")]
    Rejected(#[from] EngineError),

    #[error("asset {0} is unavailable")]
    AssetUnavailable(String),
}

/// Cheap to clone; all clones share the same actor map.
#[derive(Debug, Clone)]
pub struct OrderRouter {
    inner: Arc<RouterInner>,
}

#[derive(Debug)]
struct RouterInner {
    assets: DashMap<String, AssetHandle>,
    matcher: Arc<dyn Matcher>,
    trade_tx: TradeTx,
    queue_capacity: usize,
}

impl OrderRouter {
    /// Router using price-time matching for every asset.
    pub fn new(trade_tx: TradeTx, queue_capacity: usize) -> Self {
        Self::with_matcher(Arc::new(PriceTimeMatcher), trade_tx, queue_capacity)
    }

    pub fn with_matcher(matcher: Arc<dyn Matcher>, trade_tx: TradeTx, queue_capacity: usize) -> Self {
        OrderRouter {
            inner: Arc::new(RouterInner {
                assets: DashMap::new(),
                matcher,
                trade_tx,
                queue_capacity,
            }),
        }
    }

    /// Validate and enqueue an order on its asset's actor.
    ///
    /// Returns once the order is queued, not once it is matched. Waits
    /// while the asset's queue is full.
    pub async fn submit(&self, order: Order) -> Result<(), RouterError> {
        order.validate()?;
        let asset = self.get_or_create(&order.asset_id);
        debug!(asset = %order.asset_id, order = %order.id, "routing order");
        asset.submit(order).await.map_err(|e| {
            warn!(error = %e, "submit to asset actor failed");
            e
        })
    }

    /// Handle for an existing asset, if any order has created it.
    pub fn get_asset(&self, asset_id: &str) -> Option<AssetHandle> {
        self.inner.assets.get(asset_id).map(|entry| entry.value().clone())
    }

    /// Resting counts for an asset. Unknown assets report zero on both
    /// sides and are not created.
    pub async fn book_depth(&self, asset_id: &str) -> Result<BookDepth, RouterError> {
        match self.get_asset(asset_id) {
            Some(asset) => asset.depth().await,
            None => Ok(BookDepth::default()),
        }
    }

    /// Resting orders of an asset in priority order, `None` if the asset
    /// has never seen an order.
    pub async fn get_book(&self, asset_id: &str) -> Result<Option<BookSnapshot>, RouterError> {
        match self.get_asset(asset_id) {
            Some(asset) => asset.snapshot().await.map(Some),
            None => Ok(None),
        }
    }

    pub fn asset_count(&self) -> usize {
        self.inner.assets.len()
    }

    fn get_or_create(&self, asset_id: &str) -> AssetHandle {
        if let Some(existing) = self.get_asset(asset_id) {
            return existing;
        }
        self.inner
            .assets
            .entry(asset_id.to_string())
            .or_insert_with(|| {
                info!(asset = %asset_id, "creating asset actor");
                AssetHandle::spawn(
                    asset_id,
                    Arc::clone(&self.inner.matcher),
                    self.inner.trade_tx.clone(),
                    self.inner.queue_capacity,
                )
            })
            .value()
            .clone()
    }
}
