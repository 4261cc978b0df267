//! ## denm-telemetry::metrics
//! **Prometheus counters and TTC histogram**
//!
//! Counters are labelled by alert family (`collision`, `drowsiness`,
//! `lane_change`, `speed`). Clones share the same underlying metrics.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

use crate::error::TelemetryError;

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub alerts_sent: IntCounterVec,
    pub alerts_received: IntCounterVec,
    pub alerts_suppressed: IntCounterVec,
    pub alerts_ignored: IntCounterVec,
    pub alerts_relayed: IntCounterVec,
    pub reactions: IntCounterVec,
    pub ttc_seconds: Histogram,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        let family = |name: &str, help: &str| IntCounterVec::new(Opts::new(name, help), &["family"]);

        let alerts_sent = family("denm_alerts_sent_total", "Alerts handed to the transport")?;
        let alerts_received = family("denm_alerts_received_total", "DENMs decoded by receivers")?;
        let alerts_suppressed = family(
            "denm_alerts_suppressed_total",
            "Alerts dropped by the per-offender cooldown",
        )?;
        let alerts_ignored = family(
            "denm_alerts_ignored_total",
            "Alerts outside the relevance radius or cause",
        )?;
        let alerts_relayed = family("denm_alerts_relayed_total", "Alerts rebroadcast by relays")?;
        let reactions = IntCounterVec::new(
            Opts::new("denm_reactions_total", "Reactions taken by receivers"),
            &["family", "action"],
        )?;
        let ttc_seconds = Histogram::with_opts(
            HistogramOpts::new("denm_ttc_seconds", "TTC of announced collision risks")
                .buckets(vec![0.5, 1.0, 1.5, 2.0, 3.0, 5.0, 10.0]),
        )?;

        registry.register(Box::new(alerts_sent.clone()))?;
        registry.register(Box::new(alerts_received.clone()))?;
        registry.register(Box::new(alerts_suppressed.clone()))?;
        registry.register(Box::new(alerts_ignored.clone()))?;
        registry.register(Box::new(alerts_relayed.clone()))?;
        registry.register(Box::new(reactions.clone()))?;
        registry.register(Box::new(ttc_seconds.clone()))?;

        Ok(Self {
            registry,
            alerts_sent,
            alerts_received,
            alerts_suppressed,
            alerts_ignored,
            alerts_relayed,
            reactions,
            ttc_seconds,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, TelemetryError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn inc_sent(&self, family: &str) {
        self.alerts_sent.with_label_values(&[family]).inc();
    }

    pub fn inc_received(&self, family: &str) {
        self.alerts_received.with_label_values(&[family]).inc();
    }

    pub fn inc_suppressed(&self, family: &str) {
        self.alerts_suppressed.with_label_values(&[family]).inc();
    }

    pub fn inc_ignored(&self, family: &str) {
        self.alerts_ignored.with_label_values(&[family]).inc();
    }

    pub fn inc_relayed(&self, family: &str) {
        self.alerts_relayed.with_label_values(&[family]).inc();
    }

    pub fn inc_reaction(&self, family: &str, action: &str) {
        self.reactions.with_label_values(&[family, action]).inc();
    }

    pub fn observe_ttc(&self, ttc: f64) {
        if ttc.is_finite() {
            self.ttc_seconds.observe(ttc);
        }
    }

    /// Current value of a family counter, for reports.
    pub fn count(counter: &IntCounterVec, family: &str) -> u64 {
        counter.with_label_values(&[family]).get()
    }
}
