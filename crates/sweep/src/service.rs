//! Sweep scheduler: timer loop, due computation, delivery and write-back.

use std::{future::Future, sync::Arc};

use {
    chrono::{DateTime, TimeDelta, Utc},
    futures::stream::{self, StreamExt},
    hourbell_channels::{Error as ChannelError, SharedGateway, chunk_recipients},
    hourbell_common::SharedClock,
    hourbell_config::{DeliveryMode, SweepConfig},
    hourbell_store::{SubscriberStore, Subscription},
    tokio::{
        sync::{Mutex, RwLock, watch},
        task::JoinHandle,
        time::MissedTickBehavior,
    },
    tracing::{debug, error, info, warn},
};

use crate::types::{SweepReport, SweepStatus};

/// How one due subscriber came out of a sweep.
enum Outcome {
    Delivered,
    /// Accepted by the gateway, but the record changed before the write-back.
    Stale,
    Failed,
    /// Accepted by the gateway, but the write-back errored.
    StoreError,
}

impl SweepReport {
    fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Delivered => self.delivered += 1,
            Outcome::Stale => {
                self.delivered += 1;
                self.stale += 1;
            },
            Outcome::Failed => self.failed += 1,
            Outcome::StoreError => {
                self.delivered += 1;
                self.store_errors += 1;
            },
        }
    }
}

/// The running loop and the stop signal that belongs to it.
struct Timer {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

/// Owns the one recurring sweep task.
pub struct SweepService {
    store: Arc<dyn SubscriberStore>,
    gateway: SharedGateway,
    clock: SharedClock,
    config: SweepConfig,
    notify_interval: TimeDelta,
    timer: Mutex<Option<Timer>>,
    running: RwLock<bool>,
    last_run: RwLock<Option<(DateTime<Utc>, SweepReport)>>,
}

impl SweepService {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        gateway: SharedGateway,
        clock: SharedClock,
        config: SweepConfig,
    ) -> Arc<Self> {
        let notify_interval = TimeDelta::from_std(config.notify_interval).unwrap_or(TimeDelta::MAX);
        Arc::new(Self {
            store,
            gateway,
            clock,
            config,
            notify_interval,
            timer: Mutex::new(None),
            running: RwLock::new(false),
            last_run: RwLock::new(None),
        })
    }

    /// Start the timer loop. The first sweep runs immediately.
    pub async fn start(self: &Arc<Self>) {
        let mut timer = self.timer.lock().await;
        if timer.is_some() {
            debug!("sweep service already running");
            return;
        }
        *self.running.write().await = true;

        // One stop channel per run.
        let (stop_tx, stop_rx) = watch::channel(false);
        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop(stop_rx).await;
        });
        *timer = Some(Timer { handle, stop_tx });
        info!(
            sweep_interval = ?self.config.sweep_interval,
            notify_interval = ?self.config.notify_interval,
            mode = ?self.config.delivery_mode,
            "sweep service started"
        );
    }

    /// Stop the timer loop. A sweep in progress is abandoned; records it has
    /// not written back stay due.
    pub async fn stop(&self) {
        let mut timer = self.timer.lock().await;
        *self.running.write().await = false;
        if let Some(Timer { handle, stop_tx }) = timer.take() {
            let _ = stop_tx.send(true);
            handle.abort();
            info!("sweep service stopped");
        }
    }

    pub async fn status(&self) -> SweepStatus {
        let running = *self.running.read().await;
        let last = *self.last_run.read().await;
        SweepStatus {
            running,
            last_run_at: last.map(|(at, _)| at),
            last_report: last.map(|(_, report)| report),
        }
    }

    /// Count what a sweep would deliver right now without delivering or
    /// writing anything.
    pub async fn preview(&self) -> SweepReport {
        let now = self.clock.now();
        let (due, report) = self.collect_due(now).await;
        debug!(due = due.len(), "sweep preview");
        report
    }

    /// Run one sweep: scan, deliver to every due subscriber, write back.
    pub async fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let (due, mut report) = self.collect_due(now).await;

        let outcomes: Vec<Outcome> = match self.config.delivery_mode {
            DeliveryMode::Push => {
                stream::iter(due)
                    .map(|(id, read)| self.deliver_push(id, read, now))
                    .buffer_unordered(self.config.delivery_concurrency)
                    .collect()
                    .await
            },
            DeliveryMode::Multicast => {
                let batches: Vec<Vec<(String, Subscription)>> =
                    chunk_recipients(&due).map(<[_]>::to_vec).collect();
                stream::iter(batches)
                    .map(|batch| self.deliver_multicast(batch, now))
                    .buffer_unordered(self.config.delivery_concurrency)
                    .flat_map(stream::iter)
                    .collect()
                    .await
            },
        };
        for outcome in outcomes {
            report.tally(outcome);
        }

        if report.is_idle() {
            debug!(scanned = report.scanned, "sweep finished, nothing due");
        } else {
            info!(
                scanned = report.scanned,
                due = report.due,
                delivered = report.delivered,
                failed = report.failed,
                stale = report.stale,
                store_errors = report.store_errors,
                "sweep finished"
            );
        }
        *self.last_run.write().await = Some((now, report));
        report
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        // A sweep that overruns the cadence swallows the ticks it missed.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = stop_rx.changed() => break,
            }
            if *stop_rx.borrow() {
                break;
            }
            self.run_once().await;
        }
    }

    /// Scan the whole store and keep the records that are due at `now`.
    ///
    /// The scan is drained before anything is written back.
    async fn collect_due(&self, now: DateTime<Utc>) -> (Vec<(String, Subscription)>, SweepReport) {
        let mut report = SweepReport::default();
        let mut due = Vec::new();

        let mut rows = self.store.scan();
        while let Some(row) = rows.next().await {
            match row {
                Ok((id, subscription)) => {
                    report.scanned += 1;
                    if subscription.is_due(now, self.notify_interval) {
                        due.push((id, subscription));
                    }
                },
                Err(e) => {
                    report.store_errors += 1;
                    error!(error = %e, "failed to read subscriber during sweep");
                },
            }
        }

        report.due = due.len();
        (due, report)
    }

    async fn deliver_push(&self, id: String, read: Subscription, now: DateTime<Utc>) -> Outcome {
        let message = self.config.broadcast_message.as_str();
        match self.bounded("push", self.gateway.push(&id, message)).await {
            Ok(()) => self.settle(&id, &read, now).await,
            Err(e) => {
                warn!(subscriber_id = %id, error = %e, "delivery failed, subscriber stays due");
                Outcome::Failed
            },
        }
    }

    async fn deliver_multicast(
        &self,
        batch: Vec<(String, Subscription)>,
        now: DateTime<Utc>,
    ) -> Vec<Outcome> {
        let to: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
        let message = self.config.broadcast_message.as_str();
        match self.bounded("multicast", self.gateway.multicast(&to, message)).await {
            Ok(()) => {
                let mut outcomes = Vec::with_capacity(batch.len());
                for (id, read) in &batch {
                    outcomes.push(self.settle(id, read, now).await);
                }
                outcomes
            },
            Err(e) => {
                warn!(
                    recipients = batch.len(),
                    error = %e,
                    "multicast failed, recipients stay due"
                );
                batch.iter().map(|_| Outcome::Failed).collect()
            },
        }
    }

    async fn bounded(
        &self,
        operation: &'static str,
        call: impl Future<Output = hourbell_channels::Result<()>>,
    ) -> hourbell_channels::Result<()> {
        let limit = self.config.delivery_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(ChannelError::timeout(operation, limit)))
    }

    /// Record an accepted delivery, unless the subscriber stopped or
    /// restarted since the scan read the record.
    async fn settle(&self, id: &str, read: &Subscription, now: DateTime<Utc>) -> Outcome {
        match self.store.advance_last_sent(id, read, now).await {
            Ok(true) => {
                debug!(subscriber_id = %id, sent_at = %now, "delivered");
                Outcome::Delivered
            },
            Ok(false) => {
                debug!(subscriber_id = %id, "record changed during sweep, not advancing");
                Outcome::Stale
            },
            Err(e) => {
                error!(subscriber_id = %id, error = %e, "failed to record delivery");
                Outcome::StoreError
            },
        }
    }
}
