//! Error taxonomy for index construction, insertion, and range scans.

use thiserror::Error;

/// Comparison operator accepted at a scan boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    GT,
    GTE,
    LT,
    LTE,
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// An existing index file's header disagrees with the constructor arguments.
    #[error("index header mismatch: expected relation={expected_relation:?} offset={expected_offset}, found relation={found_relation:?} offset={found_offset}")]
    BadIndexInfo {
        expected_relation: String,
        expected_offset: i32,
        found_relation: String,
        found_offset: i32,
    },

    /// `startScan` was given comparison operators outside `{GT,GTE}`/`{LT,LTE}`.
    #[error("bad scan opcodes: low={low:?} high={high:?}")]
    BadOpcodes { low: Opcode, high: Opcode },

    /// `startScan` was given `lowVal > highVal`.
    #[error("bad scan range: low > high")]
    BadScanRange,

    /// `startScan` found no key satisfying the low bound anywhere in the tree.
    #[error("no key found satisfying scan's low bound")]
    NoSuchKeyFound,

    /// `scanNext`/`endScan` called without an active scan.
    #[error("scan not initialized")]
    ScanNotInitialized,

    /// `scanNext` called past the last in-range entry.
    #[error("index scan completed")]
    IndexScanCompleted,

    /// Used internally to distinguish "file absent" from other open failures.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Raised by a relation scanner at the end of its records; expected and
    /// swallowed locally during bootstrap.
    #[error("end of file")]
    EndOfFile,
}
