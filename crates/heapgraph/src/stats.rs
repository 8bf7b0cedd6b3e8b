//! Stats Module - Dump counters
//!
//! Counts what a dump session emitted and skipped. Useful to sanity-check a
//! dump file against the heap it came from:
//! - Records emitted and references written
//! - Objects skipped by the exclusion filter or the dedup slot
//! - Bytes handed to the sink and total estimated size

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpStats {
    /// Records written
    pub records_emitted: u64,
    /// Objects skipped because the filter excluded them
    pub skipped_excluded: u64,
    /// Objects skipped because they were the previous emission
    pub skipped_duplicate: u64,
    /// Reference addresses written across all records
    pub refs_emitted: u64,
    /// Bytes handed to the sink
    pub bytes_written: u64,
    /// Sum of the `size` field of every record
    pub total_size: u64,
    /// Largest `refs` list in one record
    pub max_refs_in_record: usize,
}

impl DumpStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one emitted object
    pub fn record(&mut self, size: usize, ref_count: usize) {
        self.records_emitted += 1;
        self.total_size += size as u64;
        self.refs_emitted += ref_count as u64;
        if ref_count > self.max_refs_in_record {
            self.max_refs_in_record = ref_count;
        }
    }

    /// Merge with other stats
    pub fn merge(&mut self, other: &DumpStats) {
        self.records_emitted += other.records_emitted;
        self.skipped_excluded += other.skipped_excluded;
        self.skipped_duplicate += other.skipped_duplicate;
        self.refs_emitted += other.refs_emitted;
        self.bytes_written += other.bytes_written;
        self.total_size += other.total_size;
        self.max_refs_in_record = self.max_refs_in_record.max(other.max_refs_in_record);
    }

    /// Average number of references per record
    pub fn avg_refs_per_record(&self) -> f64 {
        if self.records_emitted == 0 {
            return 0.0;
        }
        self.refs_emitted as f64 / self.records_emitted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_merge() {
        let mut a = DumpStats::new();
        a.record(64, 3);
        a.record(32, 1);

        let mut b = DumpStats::new();
        b.record(16, 7);
        b.skipped_duplicate = 2;

        a.merge(&b);
        assert_eq!(a.records_emitted, 3);
        assert_eq!(a.total_size, 112);
        assert_eq!(a.refs_emitted, 11);
        assert_eq!(a.max_refs_in_record, 7);
        assert_eq!(a.skipped_duplicate, 2);
        assert!((a.avg_refs_per_record() - 11.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(DumpStats::new().avg_refs_per_record(), 0.0);
    }
}
