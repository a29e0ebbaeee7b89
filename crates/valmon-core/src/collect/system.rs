//! Host-level resource usage collector.
//!
//! Reads `/proc` through the `FileSystem` trait so tests can run against
//! an in-memory filesystem. CPU percentages are deltas between two
//! consecutive readings, so the first collect returns `None` for the
//! CPU fields.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::model::SystemUsage;
use crate::parse::parse_df;
use crate::util::run_command;

/// Abstraction over filesystem reads, for testing without a real `/proc`.
pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem, delegating to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(path)? {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

/// In-memory filesystem for tests.
#[derive(Debug, Default, Clone)]
pub struct MockFs {
    files: std::collections::HashMap<PathBuf, String>,
    dirs: Vec<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn add_dir(&mut self, path: impl Into<PathBuf>) {
        self.dirs.push(path.into());
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{:?}", path)))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .dirs
            .iter()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }
}

/// Aggregate CPU counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CpuTotals {
    busy: u64,
    steal: u64,
    idle: u64,
}

impl CpuTotals {
    fn total(&self) -> u64 {
        self.busy + self.steal + self.idle
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Fields: user nice system idle iowait irq softirq steal guest guest_nice.
/// idle and iowait count as idle; steal is tracked separately.
fn parse_cpu_totals(content: &str) -> Option<CpuTotals> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu ") || *l == "cpu")?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().unwrap_or(0))
        .collect();
    if fields.len() < 8 {
        return None;
    }

    let idle = fields[3] + fields[4];
    let steal = fields[7];
    let busy = fields[0] + fields[1] + fields[2] + fields[5] + fields[6];

    Some(CpuTotals { busy, steal, idle })
}

/// Parses MemTotal/MemAvailable from `/proc/meminfo` into a used percent.
fn parse_mem_percent(content: &str) -> Option<f64> {
    let parse_kb = |key: &str| -> Option<u64> {
        content
            .lines()
            .find(|l| l.starts_with(key))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };

    let total = parse_kb("MemTotal:")?;
    let available = parse_kb("MemAvailable:")?;
    if total == 0 {
        return None;
    }

    Some((total.saturating_sub(available)) as f64 / total as f64 * 100.0)
}

/// Host usage collector. Keeps the previous CPU reading for deltas.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    data_dir: Option<String>,
    prev_cpu: Option<CpuTotals>,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a collector reading from `proc_path` (usually `/proc`).
    ///
    /// When `data_dir` is set, disk used/free ratios for its filesystem
    /// are included via `df -kP`.
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, data_dir: Option<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            data_dir,
            prev_cpu: None,
        }
    }

    /// Collects one host usage sample. Individual readings that fail are
    /// simply left `None`; this never errors as a whole.
    pub fn collect(&mut self) -> SystemUsage {
        let mut usage = SystemUsage::default();

        match self.fs.read_to_string(&self.proc_path.join("stat")) {
            Ok(content) => {
                if let Some(current) = parse_cpu_totals(&content) {
                    if let Some(prev) = self.prev_cpu {
                        let delta_total = current.total().saturating_sub(prev.total());
                        if delta_total > 0 {
                            let delta_busy = current.busy.saturating_sub(prev.busy);
                            let delta_steal = current.steal.saturating_sub(prev.steal);
                            usage.cpu_percent =
                                Some(delta_busy as f64 / delta_total as f64 * 100.0);
                            usage.cpu_steal_percent =
                                Some(delta_steal as f64 / delta_total as f64 * 100.0);
                        }
                    }
                    self.prev_cpu = Some(current);
                }
            }
            Err(e) => debug!("reading proc stat failed: {}", e),
        }

        match self.fs.read_to_string(&self.proc_path.join("meminfo")) {
            Ok(content) => usage.mem_percent = parse_mem_percent(&content),
            Err(e) => debug!("reading meminfo failed: {}", e),
        }

        match self.fs.read_dir(&self.proc_path) {
            Ok(entries) => {
                let count = entries
                    .iter()
                    .filter_map(|p| p.file_name())
                    .filter(|n| n.to_string_lossy().bytes().all(|b| b.is_ascii_digit()))
                    .count();
                usage.process_count = Some(count as u64);
            }
            Err(e) => debug!("listing proc failed: {}", e),
        }

        if let Some(ref data_dir) = self.data_dir {
            match run_command("df", &["-kP", data_dir]) {
                Ok(output) => {
                    if let Some(entry) = parse_df(&output) {
                        usage.disk_used_ratio = Some(entry.used_ratio());
                        usage.disk_free_ratio = Some(entry.free_ratio());
                    }
                }
                Err(e) => debug!("df on {} failed: {}", data_dir, e),
            }
        }

        usage
    }
}
