//! HTTP collector sink.
//!
//! # Responsibilities
//! - Probe the collector before the honeypot starts listening
//! - Buffer records in a bounded queue fed by connection workers
//! - Submit batches as JSON arrays, retrying with jittered backoff
//!
//! # Design Decisions
//! - The sender sits behind an `ArcSwapOption` so shutdown can close the queue
//!   while workers keep calling `enqueue` without a lock
//! - A batch that exhausts its attempts is dropped and counted

use std::sync::Mutex;
use std::time::Duration;
use arc_swap::ArcSwapOption;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::TelemetryConfig;
use crate::observability::metrics;
use crate::resilience::Backoff;
use crate::telemetry::{LogRecord, TelemetryError, TelemetrySink};

/// Sink posting batches of records to an HTTP collector.
pub struct CollectorSink {
    config: TelemetryConfig,
    client: reqwest::Client,
    sender: ArcSwapOption<mpsc::Sender<LogRecord>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CollectorSink {
    pub fn new(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .no_proxy()
            .build()?;
        Ok(Self {
            config,
            client,
            sender: ArcSwapOption::empty(),
            worker: Mutex::new(None),
        })
    }

    pub fn is_running(&self) -> bool {
        self.sender.load().is_some()
    }

    async fn probe(&self) -> Result<(), TelemetryError> {
        if self.config.health_url.is_empty() {
            return Ok(());
        }
        let response = self.client.get(&self.config.health_url).send().await?;
        if !response.status().is_success() {
            return Err(TelemetryError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    fn flush_timeout(&self) -> Duration {
        let per_attempt = self.config.request_timeout_secs.max(1) * 1000 + self.config.retry_max_delay_ms;
        Duration::from_millis(per_attempt * u64::from(self.config.max_attempts.max(1)))
    }
}

impl TelemetrySink for CollectorSink {
    async fn start(&self) -> Result<(), TelemetryError> {
        if self.is_running() {
            return Ok(());
        }
        self.probe().await?;

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let submitter = Submitter {
            client: self.client.clone(),
            config: self.config.clone(),
        };
        let handle = tokio::spawn(submitter.run(rx));

        *self.worker.lock().expect("telemetry worker mutex poisoned") = Some(handle);
        self.sender.store(Some(std::sync::Arc::new(tx)));

        tracing::info!(endpoint = %self.config.endpoint, "Telemetry sink started");
        Ok(())
    }

    fn enqueue(&self, record: LogRecord) {
        let guard = self.sender.load();
        let Some(tx) = &*guard else {
            tracing::warn!("Telemetry sink not running, dropping record");
            metrics::record_telemetry_dropped("not_running", 1);
            return;
        };
        match tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Telemetry queue full, dropping record");
                metrics::record_telemetry_dropped("queue_full", 1);
            }
            Err(TrySendError::Closed(_)) => {
                metrics::record_telemetry_dropped("closed", 1);
            }
        }
    }

    async fn shutdown(&self) {
        // Dropping the last sender ends the submitter loop after a final flush.
        self.sender.store(None);
        let handle = self.worker.lock().expect("telemetry worker mutex poisoned").take();
        let Some(handle) = handle else {
            return;
        };
        match time::timeout(self.flush_timeout(), handle).await {
            Ok(Ok(())) => tracing::info!("Telemetry sink flushed and stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Telemetry submitter task failed"),
            Err(_) => tracing::warn!("Telemetry flush timed out, pending records lost"),
        }
    }
}

/// Background batching loop.
struct Submitter {
    client: reqwest::Client,
    config: TelemetryConfig,
}

impl Submitter {
    async fn run(self, mut rx: mpsc::Receiver<LogRecord>) {
        let interval = Duration::from_millis(self.config.flush_interval_ms.max(1));
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        let mut batch = Vec::with_capacity(self.config.batch_size);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= self.config.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => {
                        self.flush(&mut batch).await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.flush(&mut batch).await;
                }
            }
        }
        tracing::debug!("Telemetry submitter exiting");
    }

    async fn flush(&self, batch: &mut Vec<LogRecord>) {
        if batch.is_empty() {
            return;
        }
        let records = std::mem::take(batch);
        let max_attempts = self.config.max_attempts.max(1);
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(self.config.retry_base_delay_ms),
            max: Duration::from_millis(self.config.retry_max_delay_ms),
        };

        for attempt in 1..=max_attempts {
            match self.post(&records).await {
                Ok(()) => {
                    tracing::debug!(records = records.len(), attempt, "Telemetry batch submitted");
                    metrics::record_telemetry_submitted(records.len());
                    return;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Telemetry submission failed");
                    if attempt < max_attempts {
                        time::sleep(backoff.delay(attempt)).await;
                    }
                }
            }
        }

        tracing::error!(records = records.len(), "Dropping telemetry batch after {} attempts", max_attempts);
        metrics::record_telemetry_dropped("delivery_failed", records.len());
    }

    async fn post(&self, records: &[LogRecord]) -> Result<(), TelemetryError> {
        let mut request = self.client.post(&self.config.endpoint).json(records);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(TelemetryError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
