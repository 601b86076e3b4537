//! The reconciliation cycle: poll, diff, apply rules, alert, enrich, group.
//!
//! One logical task owns a [`Reconciler`] and drives it from a timer and a
//! command channel. Each cycle runs to completion before the next trigger is
//! considered, so cycles never overlap.

use std::collections::HashSet;
use std::time::Duration;

use itertools::Itertools;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing as log;

use crate::alerts::AlertSink;
use crate::enrichment::EnrichmentCache;
use crate::github::{Notification, NotificationSource};
use crate::group::{self, NotificationGroup};
use crate::rules::engine;
use crate::rules::store::RuleStore;

/// Individual alerts dispatched per cycle before collapsing the rest into a
/// single "N more" summary.
pub const MAX_INDIVIDUAL_ALERTS: usize = 5;

/// Messages a UI or signal handler can send into the poll loop.
#[derive(Debug)]
pub enum Command {
    /// Run a cycle now instead of waiting for the timer.
    Refresh,
    /// Credentials changed: drop the baseline, then run a cycle. The cycle
    /// adopts whatever the new account sees without alerting.
    ResetAndRefresh,
}

pub struct Reconciler<S, A> {
    source: S,
    alerts: A,
    rules: RuleStore,
    cache: EnrichmentCache,
    /// Ids seen as of the end of the previous cycle. `None` until the first
    /// successful fetch (or after a credential reset); that cycle adopts the
    /// baseline without alerting.
    baseline: Option<HashSet<String>>,
    notifications: Vec<Notification>,
    groups: Vec<NotificationGroup>,
    alerts_enabled: bool,
}

impl<S: NotificationSource, A: AlertSink> Reconciler<S, A> {
    pub fn new(source: S, alerts: A, rules: RuleStore, alerts_enabled: bool) -> Self {
        Reconciler {
            source,
            alerts,
            rules,
            cache: EnrichmentCache::new(),
            baseline: None,
            notifications: Vec::new(),
            groups: Vec::new(),
            alerts_enabled,
        }
    }

    /// The notifications held for display, as of the last successful cycle.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn groups(&self) -> &[NotificationGroup] {
        &self.groups
    }

    pub fn cache(&self) -> &EnrichmentCache {
        &self.cache
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleStore {
        &mut self.rules
    }

    /// Forgets the baseline so the next cycle re-adopts the feed silently.
    ///
    /// Without this, every notification visible to a newly-configured
    /// account would alert at once.
    pub fn reset_baseline(&mut self) {
        self.baseline = None;
    }

    /// Marks every thread as read upstream. The local list refreshes on the
    /// next cycle.
    pub async fn mark_all_read(&self) -> anyhow::Result<()> {
        self.source.mark_all_as_read().await
    }

    /// Runs one full reconciliation cycle.
    ///
    /// Only the top-level feed fetch can abort the cycle; every later step
    /// isolates per-item failures.
    pub async fn run_cycle(&mut self) {
        let fetched = match self.source.fetch_notifications().await {
            Ok(fetched) => fetched,
            Err(e) => {
                // Keep showing the previous list; the next scheduled cycle
                // retries. Never retried in a tight loop.
                log::warn!("failed to fetch notifications: {e:#}");
                self.alerts
                    .surface_error(&format!("Failed to fetch notifications: {e}"));
                return;
            }
        };
        log::debug!("fetched {} notifications", fetched.len());

        let current_ids: HashSet<String> = fetched.iter().map(|n| n.id.clone()).collect();

        // Only issue and PR threads ever alert; everything else just shows
        // up in the list.
        let new_items: Vec<Notification> = match &self.baseline {
            None => Vec::new(),
            Some(baseline) => fetched
                .iter()
                .filter(|n| !baseline.contains(&n.id) && n.notification_type().is_thread())
                .cloned()
                .collect(),
        };

        if !new_items.is_empty() {
            log::debug!(
                "new notifications: {}",
                new_items.iter().map(|n| n.id.as_str()).format(", ")
            );
        }

        let mut consumed: HashSet<String> = HashSet::new();
        let mut alert_batch: Vec<Notification> = Vec::new();
        let prepared = self.rules.prepared();
        for n in &new_items {
            let result = engine::evaluate_prepared(n, &prepared);
            if let Some(rule_id) = result.matched_rule {
                log::debug!("rule {rule_id} matched notification {}", n.id);
            }
            if result.mark_as_read {
                // Sequential, each awaited; one failure never cancels the
                // rest. The thread stays unread upstream on failure and
                // simply reappears next cycle without re-alerting.
                if let Err(e) = self.source.mark_as_read(&n.id).await {
                    log::debug!("mark-as-read for {} failed: {e:#}", n.id);
                }
                consumed.insert(n.id.clone());
            } else if !result.suppress_alert {
                alert_batch.push(n.clone());
            }
        }

        if self.alerts_enabled && !alert_batch.is_empty() {
            let shown = alert_batch.len().min(MAX_INDIVIDUAL_ALERTS);
            self.alerts.send_alerts(&alert_batch[..shown]);
            if alert_batch.len() > shown {
                self.alerts.send_summary(alert_batch.len() - shown);
            }
        }

        // Items consumed by a rule drop out of the display this cycle even
        // though the raw fetch still contained them.
        let display: Vec<Notification> = fetched
            .into_iter()
            .filter(|n| !consumed.contains(&n.id))
            .collect();

        self.cache.fill_missing(&self.source, &display).await;
        self.cache.prune(&display);

        self.groups = group::group(&display);
        self.notifications = display;
        // The pre-filter id set becomes the baseline: rule-consumed items
        // still count as seen so they are not re-detected next cycle.
        self.baseline = Some(current_ids);
    }

    /// Drives the reconciler until `shutdown` flips or the command channel
    /// closes. Returns the reconciler so callers can inspect final state.
    ///
    /// The loop awaits each cycle before selecting the next trigger, so two
    /// cycles can never run concurrently; timer ticks that fire mid-cycle
    /// coalesce. Shutdown only prevents the next cycle from being scheduled,
    /// it never aborts an in-flight one.
    pub async fn run(
        mut self,
        interval: Duration,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = timer.tick() => {}
                command = commands.recv() => match command {
                    Some(Command::Refresh) => {}
                    Some(Command::ResetAndRefresh) => self.reset_baseline(),
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
            self.run_cycle().await;
        }
        log::info!("reconciler stopped");
        self
    }
}
