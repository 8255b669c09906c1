// Metrics collection and tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Latency of whole turns: message received to last frame written.
#[derive(Debug)]
pub struct TurnLatency {
    count: AtomicU64,
    total_ms: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,
    // Last 1000 samples, enough for a rough percentile
    samples: Mutex<Vec<u64>>,
}

impl TurnLatency {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            total_ms: AtomicU64::new(0),
            min_ms: AtomicU64::new(u64::MAX),
            max_ms: AtomicU64::new(0),
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, latency_ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(latency_ms, Ordering::Relaxed);

        let mut current_min = self.min_ms.load(Ordering::Relaxed);
        while latency_ms < current_min {
            match self.min_ms.compare_exchange_weak(
                current_min,
                latency_ms,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current_min = x,
            }
        }

        let mut current_max = self.max_ms.load(Ordering::Relaxed);
        while latency_ms > current_max {
            match self.max_ms.compare_exchange_weak(
                current_max,
                latency_ms,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => current_max = x,
            }
        }

        if let Ok(mut samples) = self.samples.lock() {
            samples.push(latency_ms);
            if samples.len() > 1000 {
                samples.remove(0);
            }
        }
    }

    pub fn avg_ms(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.total_ms.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn min_ms(&self) -> u64 {
        match self.min_ms.load(Ordering::Relaxed) {
            u64::MAX => 0,
            v => v,
        }
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms.load(Ordering::Relaxed)
    }

    pub fn percentile(&self, p: u8) -> u64 {
        if let Ok(samples) = self.samples.lock() {
            if samples.is_empty() {
                return 0;
            }
            let mut sorted = samples.clone();
            sorted.sort_unstable();
            let index = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
            sorted[index]
        } else {
            0
        }
    }
}

impl Default for TurnLatency {
    fn default() -> Self {
        Self::new()
    }
}

/// Relay-wide counters. Sessions only ever add to these; nothing reads them
/// back to make decisions.
#[derive(Debug)]
pub struct RelayMetrics {
    started: Instant,
    pub sessions_opened: AtomicU64,
    pub sessions_active: AtomicU64,
    pub messages: AtomicU64,
    pub decode_fallbacks: AtomicU64,
    pub fallback_replies: AtomicU64,
    pub chunks_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub partial_streams: AtomicU64,
    pub turn_latency: TurnLatency,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            sessions_opened: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            messages: AtomicU64::new(0),
            decode_fallbacks: AtomicU64::new(0),
            fallback_replies: AtomicU64::new(0),
            chunks_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            partial_streams: AtomicU64::new(0),
            turn_latency: TurnLatency::new(),
        }
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_message(&self, decode_fallback: bool, reply_fallback: bool) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        if decode_fallback {
            self.decode_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        if reply_fallback {
            self.fallback_replies.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_stream(&self, chunks: usize, bytes: usize, complete: bool) {
        self.chunks_sent.fetch_add(chunks as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        if !complete {
            self.partial_streams.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsResponse {
        MetricsResponse {
            timestamp: Utc::now(),
            uptime_seconds: self.started.elapsed().as_secs(),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            decode_fallbacks: self.decode_fallbacks.load(Ordering::Relaxed),
            fallback_replies: self.fallback_replies.load(Ordering::Relaxed),
            chunks_sent: self.chunks_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            partial_streams: self.partial_streams.load(Ordering::Relaxed),
            turn_latency: TurnLatencyStats {
                avg_ms: self.turn_latency.avg_ms(),
                min_ms: self.turn_latency.min_ms(),
                max_ms: self.turn_latency.max_ms(),
                p50_ms: self.turn_latency.percentile(50),
                p95_ms: self.turn_latency.percentile(95),
            },
        }
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub sessions_opened: u64,
    pub sessions_active: u64,
    pub messages: u64,
    pub decode_fallbacks: u64,
    pub fallback_replies: u64,
    pub chunks_sent: u64,
    pub bytes_sent: u64,
    pub partial_streams: u64,
    pub turn_latency: TurnLatencyStats,
}

#[derive(Debug, Serialize)]
pub struct TurnLatencyStats {
    pub avg_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
}
