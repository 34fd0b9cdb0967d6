use std::{
    collections::VecDeque,
    sync::atomic::{AtomicI64, Ordering},
};

use shared::{domain::ScanLogId, protocol::ScanLog};
use tokio::sync::RwLock;

use crate::permits::PermitRegistry;

pub(crate) struct AppState {
    pub(crate) permits: PermitRegistry,
    live_feed: RwLock<VecDeque<ScanLog>>,
    live_feed_capacity: usize,
    next_scan_log_id: AtomicI64,
}

impl AppState {
    pub(crate) fn new(permits: PermitRegistry, live_feed_capacity: usize) -> Self {
        Self {
            permits,
            live_feed: RwLock::new(VecDeque::new()),
            live_feed_capacity: live_feed_capacity.max(1),
            next_scan_log_id: AtomicI64::new(1),
        }
    }

    pub(crate) fn allocate_scan_log_id(&self) -> ScanLogId {
        ScanLogId(self.next_scan_log_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn live_feed_capacity(&self) -> usize {
        self.live_feed_capacity
    }

    /// Newest first; the oldest entries fall off past capacity.
    pub(crate) async fn push_feed(&self, scan_log: ScanLog) {
        let mut feed = self.live_feed.write().await;
        feed.push_front(scan_log);
        feed.truncate(self.live_feed_capacity);
    }

    pub(crate) async fn recent_feed(&self, limit: usize) -> Vec<ScanLog> {
        self.live_feed
            .read()
            .await
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }
}
