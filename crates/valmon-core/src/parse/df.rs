//! Parser for POSIX `df -kP` output, used for data-dir disk ratios.

/// Disk usage for a single filesystem, in 1K blocks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DfEntry {
    pub total_kb: u64,
    pub used_kb: u64,
    pub avail_kb: u64,
}

impl DfEntry {
    /// Used fraction of the filesystem, 0.0 when total is unknown.
    pub fn used_ratio(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        self.used_kb as f64 / self.total_kb as f64
    }

    /// Free fraction of the filesystem, 0.0 when total is unknown.
    pub fn free_ratio(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        self.avail_kb as f64 / self.total_kb as f64
    }
}

/// Parses `df -kP <path>` output and returns the last data row.
///
/// Format: header line, then
/// `filesystem 1024-blocks used available capacity mount`.
/// Non-numeric lines (warnings, noise) are skipped like any other
/// malformed row. Returns `None` when no data row is present.
pub fn parse_df(output: &str) -> Option<DfEntry> {
    let mut entry = None;

    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }

        let (Ok(total_kb), Ok(used_kb), Ok(avail_kb)) = (
            parts[1].parse::<u64>(),
            parts[2].parse::<u64>(),
            parts[3].parse::<u64>(),
        ) else {
            continue;
        };
        entry = Some(DfEntry {
            total_kb,
            used_kb,
            avail_kb,
        });
    }

    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_df() {
        let output = "\
Filesystem     1024-blocks      Used Available Capacity Mounted on
/dev/nvme0n1p2   488245288 122061322 341287246      27% /
";
        let entry = parse_df(output).unwrap();
        assert_eq!(entry.total_kb, 488245288);
        assert_eq!(entry.used_kb, 122061322);
        assert_eq!(entry.avail_kb, 341287246);
        assert!((entry.used_ratio() - 0.25).abs() < 0.01);
        assert!((entry.free_ratio() - 0.70).abs() < 0.01);
    }

    #[test]
    fn test_noise_row_does_not_discard_valid_rows() {
        // A trailing warning line with enough tokens must be skipped,
        // keeping the data row already scanned.
        let output = "\
Filesystem     1024-blocks      Used Available Capacity Mounted on
/dev/nvme0n1p2   488245288 122061322 341287246      27% /
df: warning: cannot read table of mounted file systems for details
";
        let entry = parse_df(output).unwrap();
        assert_eq!(entry.total_kb, 488245288);
        assert_eq!(entry.used_kb, 122061322);
    }

    #[test]
    fn test_parse_df_no_rows() {
        assert!(parse_df("Filesystem 1024-blocks Used Available Capacity Mounted on\n").is_none());
        assert!(parse_df("").is_none());
    }

    #[test]
    fn test_zero_total_ratios() {
        let entry = DfEntry::default();
        assert_eq!(entry.used_ratio(), 0.0);
        assert_eq!(entry.free_ratio(), 0.0);
    }
}
