//! Observability and Metrics
//!
//! Counters for codec traffic and failures, broken down by status.
//!
//! Uses atomic counters for thread-safe metrics collection.

use crate::error::{PacketError, PacketStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Global metrics collector for codec operations
#[derive(Debug)]
pub struct Metrics {
    /// Frames written by the encoder
    pub packets_encoded: AtomicU64,
    /// Frames accepted by the decoder
    pub packets_decoded: AtomicU64,
    /// Bytes written by the encoder
    pub bytes_encoded: AtomicU64,
    /// Bytes consumed by the decoder
    pub bytes_decoded: AtomicU64,
    /// Encoded or decoded frames carrying a data block
    pub payload_packets: AtomicU64,
    /// Failures on one of the six identifier/opcode/sequence fields
    pub field_errors: AtomicU64,
    /// Leading or trailing marker mismatches
    pub framing_errors: AtomicU64,
    /// Illegal frame lengths and undersized buffers
    pub length_errors: AtomicU64,
    /// Payload flag outside {0, 1}
    pub flag_errors: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            packets_encoded: AtomicU64::new(0),
            packets_decoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            payload_packets: AtomicU64::new(0),
            field_errors: AtomicU64::new(0),
            framing_errors: AtomicU64::new(0),
            length_errors: AtomicU64::new(0),
            flag_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a frame written by the encoder
    pub fn packet_encoded(&self, byte_count: u64, has_payload: bool) {
        self.packets_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(byte_count, Ordering::Relaxed);
        if has_payload {
            self.payload_packets.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a frame accepted by the decoder
    pub fn packet_decoded(&self, byte_count: u64, has_payload: bool) {
        self.packets_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(byte_count, Ordering::Relaxed);
        if has_payload {
            self.payload_packets.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a rejected frame under its status class
    pub fn packet_failed(&self, err: &PacketError) {
        let counter = match err.status() {
            PacketStatus::BadFraming => &self.framing_errors,
            PacketStatus::BadLength => &self.length_errors,
            PacketStatus::BadPayloadFlag => &self.flag_errors,
            _ => &self.field_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_encoded: self.packets_encoded.load(Ordering::Relaxed),
            packets_decoded: self.packets_decoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            payload_packets: self.payload_packets.load(Ordering::Relaxed),
            field_errors: self.field_errors.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            length_errors: self.length_errors.load(Ordering::Relaxed),
            flag_errors: self.flag_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            packets_encoded = snapshot.packets_encoded,
            packets_decoded = snapshot.packets_decoded,
            bytes_encoded = snapshot.bytes_encoded,
            bytes_decoded = snapshot.bytes_decoded,
            payload_packets = snapshot.payload_packets,
            field_errors = snapshot.field_errors,
            framing_errors = snapshot.framing_errors,
            length_errors = snapshot.length_errors,
            flag_errors = snapshot.flag_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub packets_encoded: u64,
    pub packets_decoded: u64,
    pub bytes_encoded: u64,
    pub bytes_decoded: u64,
    pub payload_packets: u64,
    pub field_errors: u64,
    pub framing_errors: u64,
    pub length_errors: u64,
    pub flag_errors: u64,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// All rejected frames
    pub fn total_errors(&self) -> u64 {
        self.field_errors + self.framing_errors + self.length_errors + self.flag_errors
    }
}

/// Global metrics instance (lazy static for simplicity)
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Marker;

    #[test]
    fn test_failures_bucketed_by_status() {
        let metrics = Metrics::new();
        metrics.packet_failed(&PacketError::BadLocalId(0));
        metrics.packet_failed(&PacketError::BadOperation(7));
        metrics.packet_failed(&PacketError::BadFraming {
            marker: Marker::Trailing,
            found: 0,
        });
        metrics.packet_failed(&PacketError::BufferTooSmall {
            needed: 41,
            available: 0,
        });
        metrics.packet_failed(&PacketError::BadPayloadFlag(3));

        let snap = metrics.snapshot();
        assert_eq!(snap.field_errors, 2);
        assert_eq!(snap.framing_errors, 1);
        assert_eq!(snap.length_errors, 1);
        assert_eq!(snap.flag_errors, 1);
        assert_eq!(snap.total_errors(), 5);
    }

    #[derive(Clone, Default)]
    struct InfoCount(std::sync::Arc<AtomicU64>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for InfoCount {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::INFO {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_log_metrics_emits_one_event() {
        use tracing_subscriber::layer::SubscriberExt;

        let metrics = Metrics::new();
        metrics.packet_encoded(37, false);

        let count = InfoCount::default();
        let subscriber = tracing_subscriber::registry().with(count.clone());
        tracing::subscriber::with_default(subscriber, || metrics.log_metrics());

        assert_eq!(count.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_traffic_counters() {
        let metrics = Metrics::new();
        metrics.packet_encoded(41, false);
        metrics.packet_encoded(1065, true);
        metrics.packet_decoded(1065, true);

        let snap = metrics.snapshot();
        assert_eq!(snap.packets_encoded, 2);
        assert_eq!(snap.bytes_encoded, 1106);
        assert_eq!(snap.packets_decoded, 1);
        assert_eq!(snap.bytes_decoded, 1065);
        assert_eq!(snap.payload_packets, 2);
    }
}
