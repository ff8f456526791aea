//!
//! Fleet report assembly and CSV output
//!
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::collector::{MetricCells, MetricCollector};
use crate::config::Config;
use crate::types::Host;
use crate::{topology, Client, Result};

/// Host identity columns, always first in the header
pub const IDENTITY_COLUMNS: [&str; 5] = [
    "NODE_TYPE",
    "REPLICA_SET",
    "HOSTNAME",
    "SYSTEM_MEMORY_MB",
    "SYSTEM_NUM_CORES",
];

const FILE_PREFIX: &str = "MongoDB_Util_Report_";

/// How the metric columns of the header are chosen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnOrder {
    /// Columns of the first host with any metric. Columns only seen on later hosts are left
    /// out of the report.
    #[default]
    FirstHost,
    /// Every column seen on any host, in first seen order
    Union,
}

/// Identity of a host as reported
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostIdentity {
    pub node_type: String,
    pub replica_set: String,
    pub hostname: String,
    pub memory_mb: u64,
    pub num_cores: u64,
}

impl From<&Host> for HostIdentity {
    fn from(host: &Host) -> Self {
        let system_info = host.system_info();
        Self {
            node_type: host.node_type().to_string(),
            replica_set: host.replica_set().to_string(),
            hostname: host.hostname.clone(),
            memory_mb: system_info.mem_size_mb,
            num_cores: system_info.num_cores,
        }
    }
}

/// One line of the report
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub identity: HostIdentity,
    pub metrics: MetricCells,
}

impl ReportRow {
    /// Cells of the row for the given metric columns, absent metrics are empty
    fn record(&self, metric_columns: &[String]) -> Vec<String> {
        let identity = [
            self.identity.node_type.clone(),
            self.identity.replica_set.clone(),
            self.identity.hostname.clone(),
            self.identity.memory_mb.to_string(),
            self.identity.num_cores.to_string(),
        ];
        identity
            .into_iter()
            .chain(metric_columns.iter().map(|column| {
                self.metrics
                    .get(column)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }))
            .collect()
    }
}

/// Tracks the metric columns of the header
#[derive(Debug, Default)]
struct ColumnSet {
    order: ColumnOrder,
    columns: Vec<String>,
    known: HashSet<String>,
    dropped: HashSet<String>,
}

impl ColumnSet {
    fn new(order: ColumnOrder) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    fn observe(&mut self, cells: &MetricCells) {
        let fixed = self.order == ColumnOrder::FirstHost && !self.columns.is_empty();
        for column in cells.columns() {
            if self.known.contains(column) {
                continue;
            }
            if fixed {
                self.dropped.insert(column.to_string());
            } else {
                self.known.insert(column.to_string());
                self.columns.push(column.to_string());
            }
        }
    }
}

/// Rows of the report and the metric columns of the header
#[derive(Clone, Debug, Default)]
pub struct Report {
    metric_columns: Vec<String>,
    rows: Vec<ReportRow>,
}

impl Report {
    /// Build a report from rows, the header is chosen according to `order`
    #[must_use]
    pub fn from_rows(rows: Vec<ReportRow>, order: ColumnOrder) -> Self {
        let mut columns = ColumnSet::new(order);
        for row in &rows {
            columns.observe(&row.metrics);
        }
        if !columns.dropped.is_empty() {
            let mut dropped: Vec<_> = columns.dropped.into_iter().collect();
            dropped.sort();
            tracing::warn!(
                "{} metric columns only reported by later hosts are not in the header: {}",
                dropped.len(),
                dropped.join(", ")
            );
        }
        Self {
            metric_columns: columns.columns,
            rows,
        }
    }

    /// Header, identity columns followed by the metric columns
    pub fn header(&self) -> impl Iterator<Item = &str> {
        IDENTITY_COLUMNS
            .into_iter()
            .chain(self.metric_columns.iter().map(String::as_str))
    }

    #[must_use]
    pub fn metric_columns(&self) -> &[String] {
        &self.metric_columns
    }

    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize header and rows as CSV
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.header())?;
        for row in &self.rows {
            writer.write_record(row.record(&self.metric_columns))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the report to a timestamped file in `output_dir`, creating the directory if needed
    pub async fn write_to_dir(
        &self,
        output_dir: &Path,
        generated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<PathBuf> {
        let mut data = Vec::new();
        self.write_csv(&mut data)?;

        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(file_name(generated_at));
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

/// `MongoDB_Util_Report_2024-05-01T12-30-00-123Z.csv`
#[must_use]
pub fn file_name(generated_at: chrono::DateTime<chrono::Utc>) -> String {
    let timestamp = generated_at
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{FILE_PREFIX}{timestamp}.csv")
}

/// Drives a report run over every project and host
#[derive(Debug)]
pub struct ReportAssembler {
    client: Client,
    collector: MetricCollector,
    config: Config,
}

impl ReportAssembler {
    #[must_use]
    pub fn new(client: Client, config: Config) -> Self {
        let collector = MetricCollector::new(client.clone(), config.mode, config.window);
        Self {
            client,
            collector,
            config,
        }
    }

    /// Walk all projects and hosts and build the report.
    ///
    /// Failing requests are logged and treated as empty, a host keeps its row even when none
    /// of its metrics could be fetched.
    pub async fn assemble(&self) -> Report {
        let projects = topology::list_projects(&self.client)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("Unable to retrieve projects: {}", e);
                Vec::new()
            });
        if projects.is_empty() {
            tracing::info!("No projects found or unable to retrieve projects");
            return Report::default();
        }

        let mut rows = Vec::new();
        for project in &projects {
            tracing::info!("Processing project: {} (ID: {})", project.name, project.id);

            let hosts = topology::list_hosts(&self.client, self.config.mode, &project.id)
                .await
                .unwrap_or_else(|e| {
                    tracing::debug!("Unable to retrieve hosts of {}: {}", project.name, e);
                    Vec::new()
                });
            if hosts.is_empty() {
                tracing::info!("No hosts found for project {}, skipping", project.name);
                continue;
            }

            for host in &hosts {
                tracing::info!("Fetching metrics for {}", host.hostname);
                let metrics = self.collector.collect(&project.id, &host.id).await;
                if metrics.is_empty() {
                    tracing::warn!("No metrics found for host {}", host.hostname);
                }
                rows.push(ReportRow {
                    identity: HostIdentity::from(host),
                    metrics,
                });
            }
        }

        Report::from_rows(rows, self.config.column_order)
    }

    /// Assemble the report and write it to the output directory.
    ///
    /// Returns the path of the written file, `None` when there was nothing to report.
    pub async fn run(&self) -> Result<Option<PathBuf>> {
        let report = self.assemble().await;
        if report.is_empty() {
            tracing::info!("No data collected, report not generated");
            return Ok(None);
        }

        let path = report
            .write_to_dir(&self.config.output_dir, chrono::Utc::now())
            .await?;
        tracing::info!("Report generated successfully: {}", path.display());
        Ok(Some(path))
    }
}
