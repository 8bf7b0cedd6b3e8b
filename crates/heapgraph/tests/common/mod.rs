//! Test Utilities for the heapgraph Dump Test Suite
//!
//! Every dump produced through these helpers is parsed line by line with
//! `serde_json`. A line that is not a complete JSON object fails the test,
//! whatever the test itself goes on to check.

#![allow(dead_code)]

use heapgraph::arena::Arena;
use heapgraph::{
    DumpConfig, ExclusionFilter, GraphDumper, ObjectHandle, RecursionMode, SpecialCaseRegistry,
};
use serde_json::Value;

/// Word size of the reference heap
pub const WORD: usize = 8;

/// GC header added to cycle-tracked objects
pub const GC_HEADER: usize = 3 * WORD;

/// ============================================================================
/// DUMP FIXTURE
/// ============================================================================

/// Heap plus registry plus configuration for one test
pub struct DumpFixture {
    pub heap: Arena,
    pub registry: SpecialCaseRegistry,
    pub config: DumpConfig,
}

impl DumpFixture {
    /// Fresh heap, empty registry, default configuration
    pub fn with_defaults() -> Self {
        Self {
            heap: Arena::new(),
            registry: SpecialCaseRegistry::new(),
            config: DumpConfig::default(),
        }
    }

    /// Dump `root` with a fresh dumper and return the raw output
    pub fn dump_raw(&self, root: ObjectHandle, filter: &ExclusionFilter, mode: RecursionMode) -> String {
        let mut dumper = GraphDumper::new(&self.heap, &self.registry, self.config.clone())
            .expect("fixture config should validate");
        let mut out = Vec::new();
        dumper
            .dump(&mut out, root, filter, mode)
            .expect("dump into a Vec should not fail");
        String::from_utf8(out).expect("dump output must be UTF-8")
    }

    /// Dump `root` and parse every record
    pub fn dump(&self, root: ObjectHandle, filter: &ExclusionFilter, mode: RecursionMode) -> Vec<Value> {
        parse_records(&self.dump_raw(root, filter, mode))
    }

    /// Dump `root` without filter and return the emitted addresses in order
    pub fn dumped_addresses(&self, root: ObjectHandle, mode: RecursionMode) -> Vec<u64> {
        addresses(&self.dump(root, &ExclusionFilter::None, mode))
    }
}

/// ============================================================================
/// RECORD HELPERS
/// ============================================================================

/// Parse newline-delimited records, checking the line framing
pub fn parse_records(output: &str) -> Vec<Value> {
    if !output.is_empty() {
        assert!(output.ends_with('\n'), "dump must end with a newline: {:?}", output);
    }
    output
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line)
                .unwrap_or_else(|e| panic!("invalid record {:?}: {}", line, e));
            assert_record_shape(&value);
            value
        })
        .collect()
}

/// Every record carries address, type, size and refs
pub fn assert_record_shape(record: &Value) {
    assert!(record["address"].is_u64(), "missing address: {}", record);
    assert!(record["type"].is_string(), "missing type: {}", record);
    assert!(record["size"].is_u64(), "missing size: {}", record);
    assert!(record["refs"].is_array(), "missing refs: {}", record);
}

pub fn addresses(records: &[Value]) -> Vec<u64> {
    records
        .iter()
        .map(|r| r["address"].as_u64().expect("address is a number"))
        .collect()
}

pub fn refs_of(record: &Value) -> Vec<u64> {
    record["refs"]
        .as_array()
        .expect("refs is an array")
        .iter()
        .map(|r| r.as_u64().expect("ref is a number"))
        .collect()
}

pub fn addr(obj: ObjectHandle) -> u64 {
    obj.address() as u64
}
