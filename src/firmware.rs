use std::collections::{BTreeMap, BTreeSet};

/// Severity markers of interest in the firmware debug log.
pub const ERROR_MARKERS: [&str; 3] = ["exception [", "error [", "critical ["];
/// Known-noisy subsystem excluded from the scan.
pub const NOISE_MARKER: &str = "icmpa";

/// Distinct firmware error messages within the day window, each counted
/// against the FULL log so the report shows the true total frequency of a
/// recurring condition, not just the windowed slice.
pub fn scan_firmware_errors(lines: &[String], days: &[String]) -> BTreeMap<String, usize> {
    let mut distinct: BTreeSet<String> = BTreeSet::new();
    for line in lines {
        if !ERROR_MARKERS.iter().any(|m| line.contains(m)) {
            continue;
        }
        if line.contains(NOISE_MARKER) || !in_window(line, days) {
            continue;
        }
        if let Some(message) = strip_timestamp_field(line) {
            distinct.insert(message);
        }
    }
    let mut counts = BTreeMap::new();
    for message in distinct {
        let n = lines.iter().filter(|l| l.contains(message.as_str())).count();
        if n > 0 {
            counts.insert(message, n);
        }
    }
    counts
}

// the date portion of the timestamp, so a date inside the message text
// cannot satisfy the window check
fn in_window(line: &str, days: &[String]) -> bool {
    days.iter().any(|d| line.contains(&format!("{d}T")))
}

fn strip_timestamp_field(line: &str) -> Option<String> {
    let (_, rest) = line.split_once(' ')?;
    let message = rest.trim_start();
    if message.is_empty() { None } else { Some(message.to_string()) }
}
