use serde::{Deserialize, Serialize};

/// Tally of one migration run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub chunks: u64,
    pub packaged: u64,
    pub reused: u64,
    pub uploaded: u64,
    pub verified: u64,
    pub bytes_uploaded: u64,
    pub started_at: i64,
    pub finished_at: i64,
}
