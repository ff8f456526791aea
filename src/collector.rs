//!
//! Per host metric collection
//!
use crate::config::DeploymentMode;
use crate::stats::{self, Summary};
use crate::types::{Measurement, Measurements};
use crate::{topology, Client, Result};

/// Measurements that are reported, everything else is dropped
pub const METRICS: [&str; 25] = [
    "DISK_PARTITION_READ_IOPS_DATA",
    "DISK_PARTITION_WRITE_IOPS_DATA",
    "DISK_PARTITION_IOPS_READ",
    "DISK_PARTITION_IOPS_WRITE",
    "DISK_PARTITION_IOPS_TOTAL",
    "DISK_PARTITION_SPACE_USED",
    "DISK_PARTITION_SPACE_FREE",
    "SYSTEM_NORMALIZED_CPU_USER",
    "PROCESS_NORMALIZED_CPU_USER",
    "SYSTEM_MEMORY_USED",
    "SYSTEM_MEMORY_FREE_MB",
    "SYSTEM_MEMORY_AVAILABLE",
    "DB_DATA_SIZE_TOTAL",
    "DB_DATA_SIZE_TOTAL_WO_SYSTEM",
    "DB_INDEX_SIZE_TOTAL",
    "DB_STORAGE_TOTAL",
    "OPCOUNTERS_INSERT",
    "OPCOUNTERS_QUERY",
    "OPCOUNTERS_UPDATE",
    "OPCOUNTERS_DELETE",
    "OPCOUNTERS_GETMORE",
    "OPCOUNTERS_COMMAND",
    "CACHE_BYTES_READ_INTO",
    "CACHE_BYTES_WRITTEN_FROM",
    "OPLOG_RATE_GB_PER_HOUR",
];

/// True if `name` is in [`METRICS`]
#[must_use]
pub fn is_reported(name: &str) -> bool {
    METRICS.contains(&name)
}

/// Lookback period and sample granularity of the requested series
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub period_days: u32,
    pub granularity_hours: u32,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            period_days: 1,
            granularity_hours: 24,
        }
    }
}

impl Window {
    /// ISO-8601 duration of the period, `P1D`
    #[must_use]
    pub fn period(&self) -> String {
        format!("P{}D", self.period_days)
    }

    /// ISO-8601 duration of the granularity, `PT24H`
    #[must_use]
    pub fn granularity(&self) -> String {
        format!("PT{}H", self.granularity_hours)
    }
}

/// Metric columns of one host in insertion order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricCells {
    cells: Vec<(String, f64)>,
}

impl MetricCells {
    /// Set `column`, an existing column keeps its position
    pub fn insert(&mut self, column: String, value: f64) {
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| *value)
    }

    /// Column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    fn insert_summary(&mut self, prefix: &str, summary: Summary) {
        self.insert(format!("{prefix}_MIN"), summary.min);
        self.insert(format!("{prefix}_MAX"), summary.max);
        self.insert(format!("{prefix}_MEDIAN"), summary.median);
    }

    /// Reduce the reported series of `measurements`, partition series are prefixed with the
    /// partition name.
    pub fn add_measurements(&mut self, partition: Option<&str>, measurements: &[Measurement]) {
        for measurement in measurements.iter().filter(|m| is_reported(&m.name)) {
            let Some(summary) = stats::summarize(measurement.values()) else {
                tracing::debug!("{} has no data points", measurement.name);
                continue;
            };
            let prefix = match partition {
                Some(partition) => format!("{}_{}", partition, measurement.name),
                None => measurement.name.clone(),
            };
            self.insert_summary(&prefix, summary);
        }
    }
}

/// Fetches and reduces the measurements of hosts
#[derive(Clone, Debug)]
pub struct MetricCollector {
    client: Client,
    mode: DeploymentMode,
    window: Window,
}

impl MetricCollector {
    #[must_use]
    pub fn new(client: Client, mode: DeploymentMode, window: Window) -> Self {
        Self {
            client,
            mode,
            window,
        }
    }

    /// Host level measurements
    pub async fn host_measurements(
        &self,
        project_id: &str,
        host_id: &str,
    ) -> Result<Vec<Measurement>> {
        let (period, granularity) = (self.window.period(), self.window.granularity());
        let page: Measurements = self
            .client
            .get_json(
                &[
                    "groups",
                    project_id,
                    self.mode.host_collection(),
                    host_id,
                    "measurements",
                ],
                Some(&[("period", period.as_str()), ("granularity", granularity.as_str())]),
            )
            .await?;
        Ok(page.into_measurements())
    }

    /// Measurements of one disk partition
    pub async fn disk_measurements(
        &self,
        project_id: &str,
        host_id: &str,
        partition: &str,
    ) -> Result<Vec<Measurement>> {
        let (period, granularity) = (self.window.period(), self.window.granularity());
        let page: Measurements = self
            .client
            .get_json(
                &[
                    "groups",
                    project_id,
                    self.mode.host_collection(),
                    host_id,
                    "disks",
                    partition,
                    "measurements",
                ],
                Some(&[("period", period.as_str()), ("granularity", granularity.as_str())]),
            )
            .await?;
        Ok(page.into_measurements())
    }

    /// Collect the metric cells of a host.
    ///
    /// Never fails, a failing request leaves its section out. Partition cells come first,
    /// followed by the host cells.
    pub async fn collect(&self, project_id: &str, host_id: &str) -> MetricCells {
        let mut cells = MetricCells::default();

        let host = self
            .host_measurements(project_id, host_id)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("No measurements for host {}: {}", host_id, e);
                Vec::new()
            });

        let disks = topology::list_disks(&self.client, self.mode, project_id, host_id)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("No disks for host {}: {}", host_id, e);
                Vec::new()
            });

        for disk in &disks {
            match self
                .disk_measurements(project_id, host_id, &disk.partition_name)
                .await
            {
                Ok(measurements) => {
                    cells.add_measurements(Some(&disk.partition_name), &measurements);
                }
                Err(e) => tracing::debug!(
                    "No measurements for partition {} of host {}: {}",
                    disk.partition_name,
                    host_id,
                    e
                ),
            }
        }

        cells.add_measurements(None, &host);
        tracing::debug!("{} metric cells for host {}", cells.len(), host_id);
        cells
    }
}
