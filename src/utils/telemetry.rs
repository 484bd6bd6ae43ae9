// file: src/utils/telemetry.rs
// description: liveness and readiness reports plus operation timing
// reference: health endpoint semantics for a long-running analyzer

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn icon(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✓",
            HealthStatus::Degraded => "⚠",
            HealthStatus::Unhealthy => "✗",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthCheck {
    pub fn healthy(component: &str, response_time: Duration) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms: response_time.as_millis() as u64,
        }
    }

    pub fn degraded(component: &str, message: String, response_time: Duration) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Degraded,
            message: Some(message),
            response_time_ms: response_time.as_millis() as u64,
        }
    }

    pub fn unhealthy(component: &str, message: String, response_time: Duration) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(message),
            response_time_ms: response_time.as_millis() as u64,
        }
    }

    /// A missing directory that could be created on first use is only degraded.
    /// A path that exists but is not a writable directory is unhealthy.
    pub fn directory(component: &str, path: &Path) -> Self {
        let started = Instant::now();

        match std::fs::metadata(path) {
            Ok(meta) if !meta.is_dir() => Self::unhealthy(
                component,
                format!("{} is not a directory", path.display()),
                started.elapsed(),
            ),
            Ok(meta) if meta.permissions().readonly() => Self::unhealthy(
                component,
                format!("{} is read-only", path.display()),
                started.elapsed(),
            ),
            Ok(_) => Self::healthy(component, started.elapsed()),
            Err(_) => Self::degraded(
                component,
                format!("{} does not exist yet", path.display()),
                started.elapsed(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub timestamp: u64,
    pub version: String,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>, version: String) -> Self {
        let overall_status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();

        Self {
            overall_status,
            checks,
            timestamp,
            version,
        }
    }

    /// The process answering at all is the liveness signal.
    pub fn liveness() -> Self {
        Self::new(Vec::new(), VERSION.to_string())
    }

    pub fn readiness(config: &Config) -> Self {
        let mut checks = vec![
            HealthCheck::directory("upload_dir", &config.service.upload_dir),
            HealthCheck::directory("output_dir", &config.service.output_dir),
        ];
        if config.cache.persist {
            checks.push(HealthCheck::directory("cache_dir", &config.cache.directory));
        }

        Self::new(checks, VERSION.to_string())
    }

    pub fn is_ready(&self) -> bool {
        self.overall_status != HealthStatus::Unhealthy
    }

    pub fn format(&self) -> String {
        let mut output = format!(
            "{} System Health: {:?}\n\
             Version: {}\n\
             Timestamp: {}\n",
            self.overall_status.icon(),
            self.overall_status,
            self.version,
            chrono::DateTime::from_timestamp(self.timestamp as i64, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        if !self.checks.is_empty() {
            output.push('\n');
        }

        for check in &self.checks {
            output.push_str(&format!(
                "{} {} ({:?}) - {}ms",
                check.status.icon(),
                check.component,
                check.status,
                check.response_time_ms
            ));

            if let Some(ref msg) = check.message {
                output.push_str(&format!("\n  {}", msg));
            }

            output.push('\n');
        }

        output
    }
}

pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting operation: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed operation: {} in {:.2}s",
            self.operation,
            elapsed.as_secs_f64()
        );
        elapsed
    }

    pub fn finish_with_count(self, count: usize) -> PerformanceMetrics {
        let metrics = PerformanceMetrics::new(&self.operation, count, self.elapsed());
        info!("Completed operation: {}", metrics.format());
        metrics
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub operation: String,
    pub count: usize,
    pub duration_ms: u64,
    pub throughput: f64, // items per second
    pub avg_item_time_ms: f64,
}

impl PerformanceMetrics {
    pub fn new(operation: &str, count: usize, duration: Duration) -> Self {
        let duration_ms = duration.as_millis() as u64;
        let duration_secs = duration.as_secs_f64();

        let throughput = if duration_secs > 0.0 {
            count as f64 / duration_secs
        } else {
            0.0
        };

        let avg_item_time_ms = if count > 0 {
            duration_ms as f64 / count as f64
        } else {
            0.0
        };

        Self {
            operation: operation.to_string(),
            count,
            duration_ms,
            throughput,
            avg_item_time_ms,
        }
    }

    pub fn format(&self) -> String {
        format!(
            "{}: {} items in {}ms ({:.2} items/sec, {:.2}ms per item)",
            self.operation,
            self.count,
            self.duration_ms,
            self.throughput,
            self.avg_item_time_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_liveness_is_always_healthy() {
        let report = HealthReport::liveness();
        assert_eq!(report.overall_status, HealthStatus::Healthy);
        assert_eq!(report.version, VERSION);
        assert!(report.format().contains("System Health: Healthy"));
    }

    #[test]
    fn test_readiness_with_existing_directories() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default_config();
        config.service.upload_dir = dir.path().to_path_buf();
        config.service.output_dir = dir.path().to_path_buf();

        let report = HealthReport::readiness(&config);
        assert_eq!(report.overall_status, HealthStatus::Healthy);
        assert_eq!(report.checks.len(), 2);
    }

    #[test]
    fn test_readiness_missing_directory_is_degraded() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default_config();
        config.service.upload_dir = dir.path().join("missing");
        config.service.output_dir = dir.path().to_path_buf();

        let report = HealthReport::readiness(&config);
        assert_eq!(report.overall_status, HealthStatus::Degraded);
        assert!(report.is_ready());
    }

    #[test]
    fn test_file_in_place_of_directory_is_unhealthy() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cache");
        std::fs::write(&file, b"x").unwrap();

        let mut config = Config::default_config();
        config.service.upload_dir = dir.path().to_path_buf();
        config.service.output_dir = dir.path().to_path_buf();
        config.cache.persist = true;
        config.cache.directory = file;

        let report = HealthReport::readiness(&config);
        assert_eq!(report.overall_status, HealthStatus::Unhealthy);
        assert!(!report.is_ready());
    }

    #[test]
    fn test_performance_metrics() {
        let metrics = PerformanceMetrics::new("analyze", 100, Duration::from_secs(10));
        assert_eq!(metrics.throughput, 10.0);
        assert_eq!(metrics.avg_item_time_ms, 100.0);
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("test");
        std::thread::sleep(Duration::from_millis(10));
        let metrics = timer.finish_with_count(2);
        assert_eq!(metrics.count, 2);
        assert!(metrics.duration_ms >= 10);
    }
}
