//! Cycle scheduler — the perpetual check → drain → dispatch loop.
//!
//! Each cycle re-reads configuration. While the configuration gate is closed
//! the scheduler backs off and checks again, forever. The first time the gate
//! opens the readiness time is stamped and the notification client is built;
//! the client is then reused by every later cycle. A queue client is built
//! fresh for each cycle from that cycle's configuration.
//!
//! Cycles run strictly one after another on the caller's task.

use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use relay_common::config::{ConfigSource, NotifierConfig};
use relay_common::stats::{StatsTracker, unix_now};
use relay_notifier::NotificationProvider;
use relay_notifier::twilio::TwilioClient;
use relay_queue::drain::{DrainEnd, DrainSettings, drain_queue};
use relay_queue::provider::QueueProvider;
use relay_queue::servicebus::ServiceBusClient;

use crate::dispatcher::{DispatchOutcome, dispatch};

/// Wait before re-checking an incomplete configuration.
pub const DEFAULT_CONFIG_BACKOFF: Duration = Duration::from_millis(250);

/// Builds provider clients from a ready configuration.
pub trait ProviderFactory: Send + Sync {
    type Queue: QueueProvider;
    type Notifier: NotificationProvider;

    fn connect_queue(&self, config: &NotifierConfig) -> anyhow::Result<Self::Queue>;

    fn init_notifier(&self, config: &NotifierConfig) -> anyhow::Result<Self::Notifier>;
}

/// Azure Service Bus for the queue, Twilio for SMS.
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureTwilioFactory;

impl ProviderFactory for AzureTwilioFactory {
    type Queue = ServiceBusClient;
    type Notifier = TwilioClient;

    fn connect_queue(&self, config: &NotifierConfig) -> anyhow::Result<ServiceBusClient> {
        Ok(ServiceBusClient::from_config(config)?)
    }

    fn init_notifier(&self, config: &NotifierConfig) -> anyhow::Result<TwilioClient> {
        Ok(TwilioClient::from_config(config)?)
    }
}

/// Notification client latch, filled once when the gate first opens.
#[derive(Debug)]
pub enum ProviderState<N> {
    Uninitialized,
    Ready(N),
}

impl<N> ProviderState<N> {
    pub fn get(&self) -> Option<&N> {
        match self {
            ProviderState::Uninitialized => None,
            ProviderState::Ready(provider) => Some(provider),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub config_backoff: Duration,
    /// Also used as the pause before each cycle's first receive.
    pub drain: DrainSettings,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            config_backoff: DEFAULT_CONFIG_BACKOFF,
            drain: DrainSettings::default(),
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Configuration incomplete; no queue access was attempted.
    WaitingConfig { missing: Vec<&'static str> },
    /// The queue client could not be built; counted as a queue error.
    QueueUnavailable { error: String },
    /// Drain and dispatch ran.
    Completed {
        alerts: usize,
        drain_end: DrainEnd,
        dispatch: DispatchOutcome,
    },
}

pub struct CycleScheduler<C, F: ProviderFactory> {
    config_source: C,
    factory: F,
    stats: StatsTracker,
    notifier: ProviderState<F::Notifier>,
    gate_opened: bool,
    settings: SchedulerSettings,
}

impl<C, F> CycleScheduler<C, F>
where
    C: ConfigSource,
    F: ProviderFactory,
{
    pub fn new(config_source: C, factory: F, stats: StatsTracker) -> Self {
        Self {
            config_source,
            factory,
            stats,
            notifier: ProviderState::Uninitialized,
            gate_opened: false,
            settings: SchedulerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn notifier(&self) -> &ProviderState<F::Notifier> {
        &self.notifier
    }

    /// Run cycles forever.
    pub async fn run(&mut self) {
        tracing::info!(
            backoff_ms = self.settings.config_backoff.as_millis() as u64,
            receive_timeout_s = self.settings.drain.receive_timeout.as_secs(),
            "Cycle scheduler started"
        );

        loop {
            let cycle_id = Uuid::new_v4();
            let span = tracing::info_span!("cycle", %cycle_id);

            let outcome = self.run_cycle().instrument(span).await;
            let pause = match outcome {
                CycleOutcome::WaitingConfig { .. } | CycleOutcome::QueueUnavailable { .. } => {
                    self.settings.config_backoff
                }
                _ => self.settings.drain.receive_delay,
            };
            tokio::time::sleep(pause).await;
        }
    }

    /// Run one cycle: gate check, then drain and dispatch if the gate is open.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let config = self.config_source.load();

        if !config.is_ready() {
            let missing = config.missing_keys();
            tracing::debug!(?missing, "Configuration incomplete, waiting");
            return CycleOutcome::WaitingConfig { missing };
        }

        self.open_gate(&config);

        let queue = match self.factory.connect_queue(&config) {
            Ok(queue) => queue,
            Err(e) => {
                self.stats.record_queue_error();
                tracing::warn!(error = %e, "Failed to create queue client");
                return CycleOutcome::QueueUnavailable {
                    error: e.to_string(),
                };
            }
        };

        let report = drain_queue(&queue, &self.stats, &self.settings.drain).await;
        let alerts = report.batch.len();

        let dispatch = dispatch(&report.batch, &config, self.notifier.get(), &self.stats).await;

        if alerts > 0 {
            tracing::info!(alerts, drain_end = ?report.end, "Cycle complete");
        }

        CycleOutcome::Completed {
            alerts,
            drain_end: report.end,
            dispatch,
        }
    }

    /// Latch readiness and build the notification client the first time the
    /// gate opens. A failed build is retried on the next cycle.
    fn open_gate(&mut self, config: &NotifierConfig) {
        if !self.gate_opened {
            self.gate_opened = true;
            self.stats.mark_ready(unix_now());
            tracing::info!("Configuration complete, service ready");
        }

        if let ProviderState::Uninitialized = self.notifier {
            match self.factory.init_notifier(config) {
                Ok(provider) => {
                    self.notifier = ProviderState::Ready(provider);
                    tracing::info!("Notification client initialized");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to initialize notification client");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_state_get() {
        let empty: ProviderState<u8> = ProviderState::Uninitialized;
        assert!(empty.get().is_none());
        assert_eq!(ProviderState::Ready(7u8).get(), Some(&7));
    }

    #[test]
    fn test_default_settings() {
        let settings = SchedulerSettings::default();
        assert_eq!(settings.config_backoff, Duration::from_millis(250));
        assert_eq!(settings.drain, DrainSettings::default());
    }

    #[test]
    fn test_azure_factory_rejects_incomplete_config() {
        let factory = AzureTwilioFactory;
        assert!(factory.connect_queue(&NotifierConfig::default()).is_err());
        assert!(factory.init_notifier(&NotifierConfig::default()).is_err());
    }
}
