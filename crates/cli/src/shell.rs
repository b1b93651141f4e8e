use anyhow::{anyhow, Context, Result};
use config::JobConfig;
use planner::SplitPlanner;
use reader::{PartitionRecordReader, RowShape, ShapedRow, ShapedRows};
use split::PartitionSplit;
use store::{Key, MemStore, NodeHealth, PartitionId};
use tracing::info;

/// A demo cluster plus the job that reads it.
pub struct Shell {
    store: MemStore,
    job: JobConfig,
}

/// Rows read from one partition.
pub struct ScanResult {
    pub partition: PartitionId,
    pub split_bytes: usize,
    pub rows: Vec<(u64, ShapedRow)>,
}

impl Shell {
    pub fn new(store: MemStore, job: JobConfig) -> Self {
        Self { store, job }
    }

    pub fn store(&self) -> &MemStore {
        &self.store
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    /// Stores `value` under a `/major/-/minor` path and returns its partition.
    pub fn put(&self, path: &str, value: &str) -> Result<PartitionId> {
        let key = Key::parse(path)?;
        Ok(self.store.put(key, value.as_bytes().to_vec()))
    }

    pub fn set_health(&self, resource_id: &str, health: NodeHealth) -> Result<()> {
        self.store.set_node_health(resource_id, health)?;
        info!(replica = resource_id, ?health, "replica health changed");
        Ok(())
    }

    pub fn plan(&self) -> Result<Vec<PartitionSplit>> {
        let planner = SplitPlanner::new(self.store.clone(), self.job.clone());
        Ok(planner.plan()?)
    }

    /// Plans, ships the partition's split through its wire form, and reads it.
    pub fn scan(&self, partition: PartitionId) -> Result<ScanResult> {
        let split = self
            .plan()?
            .into_iter()
            .find(|s| s.partition_id() == partition)
            .ok_or_else(|| anyhow!("no such partition: {}", partition))?;
        self.read_split(&split)
    }

    pub fn scan_all(&self) -> Result<Vec<ScanResult>> {
        self.plan()?.iter().map(|split| self.read_split(split)).collect()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.job.columns.column_names().map(str::to_string).collect()
    }

    fn read_split(&self, split: &PartitionSplit) -> Result<ScanResult> {
        let bytes = split.encode()?;
        let shipped = PartitionSplit::decode(&bytes)?;

        let reader = PartitionRecordReader::open(&self.store, &shipped, &self.job.columns)
            .with_context(|| format!("opening partition {}", shipped.partition_id()))?;
        let rows = ShapedRows::new(reader, RowShape::new(self.job.columns.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScanResult {
            partition: shipped.partition_id(),
            split_bytes: bytes.len(),
            rows,
        })
    }
}

/// Renders one shaped row as `key | col=value col=(null)`.
pub fn format_row(columns: &[String], row_key: u64, row: &ShapedRow) -> String {
    let fields: Vec<String> = columns
        .iter()
        .zip(&row.values)
        .map(|(column, value)| match value {
            Some(v) => format!("{}={}", column, v),
            None => format!("{}=(null)", column),
        })
        .collect();
    format!("{} | {}", row_key, fields.join(" "))
}

/// Renders a split's placement as one line.
pub fn format_split(split: &PartitionSplit) -> String {
    let endpoints: Vec<String> = split.endpoints().iter().map(ToString::to_string).collect();
    format!(
        "p{} locations=[{}] endpoints=[{}]",
        split.partition_id(),
        split.locations().join(","),
        endpoints.join(",")
    )
}
