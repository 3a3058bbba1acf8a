#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

pub use asyncrun_test_utils::init_tracing;

/// Wait until `cond` holds, checking every 10ms for up to 3 seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// List the ephemeral files a job may have left in `dir`.
pub fn leftover_job_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| name.starts_with("asyncrun-"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
