use serde::Serialize;
use std::time::Duration;

/// Counters observed during the most recent run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub chunk_count: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub bytes_processed: usize,
    /// Estimated peak of buffered chunk bytes
    pub peak_buffer_bytes: usize,
    pub chunks_per_sec: f64,
    pub bytes_per_sec: f64,
}

impl PerformanceStats {
    pub fn measure(
        chunk_count: usize,
        bytes_processed: usize,
        peak_buffer_bytes: usize,
        elapsed: Duration,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate = |n: usize| if secs > 0.0 { n as f64 / secs } else { 0.0 };

        Self {
            chunk_count,
            elapsed,
            bytes_processed,
            peak_buffer_bytes,
            chunks_per_sec: rate(chunk_count),
            bytes_per_sec: rate(bytes_processed),
        }
    }
}

fn as_millis<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}
