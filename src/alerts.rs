//! Alert delivery seam.
//!
//! Delivery itself (native notification centers, menu-bar badges) is a
//! platform concern; the core only ever talks to this trait. The sink is
//! injected at construction rather than reached through a process-wide
//! dispatcher, so the pipeline stays testable.

use tracing as log;

use crate::github::{Notification, SearchHit};

pub trait AlertSink: Send + Sync {
    /// Delivers one alert per notification. The reconciler caps the batch at
    /// [`crate::reconcile::MAX_INDIVIDUAL_ALERTS`] before calling this.
    fn send_alerts(&self, items: &[Notification]);

    /// Delivers a single "N more" alert for the overflow beyond the cap.
    fn send_summary(&self, additional: usize);

    /// Delivers alerts for new results of a saved search.
    fn send_search_hits(&self, search: &str, hits: &[SearchHit]);

    /// Shows a user-visible error. Only top-level fetch failures end up
    /// here; per-item failures stay in the log.
    fn surface_error(&self, message: &str);
}

/// Sink that writes alerts to the log, for headless runs and as the default
/// until a native integration is wired up.
#[derive(Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn send_alerts(&self, items: &[Notification]) {
        for n in items {
            log::info!(
                "[{}] {}: {}",
                n.repository.full_name,
                n.reason.as_str(),
                n.subject.title
            );
        }
    }

    fn send_summary(&self, additional: usize) {
        log::info!("...and {additional} more notifications");
    }

    fn send_search_hits(&self, search: &str, hits: &[SearchHit]) {
        for hit in hits {
            log::info!("[search: {search}] #{}: {}", hit.number, hit.title);
        }
    }

    fn surface_error(&self, message: &str) {
        log::error!("{message}");
    }
}
