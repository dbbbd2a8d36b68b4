use flate2::read::GzDecoder;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A prefix must repeat strictly more than this many times within one day to
/// count as a burst.
pub const BURST_THRESHOLD: usize = 5;
/// Comparison unit for "same moment": the first 16 characters of a log line,
/// which cover date and minute of an ISO timestamp.
pub const PREFIX_LEN: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BurstRecord {
    pub prefix: String,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct DayBurst {
    pub day: String,
    pub burst: Option<BurstRecord>,
}

/// Per-switch timelines, one `DayBurst` per window day in window order.
pub type Timeline = BTreeMap<String, Vec<DayBurst>>;

/// How matching lines are selected for an error class. Case sensitive.
pub enum Matcher {
    Pattern(Regex),
    Literal(String),
}

impl Matcher {
    pub fn matches(&self, line: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(line),
            Matcher::Literal(s) => line.contains(s.as_str()),
        }
    }
}

pub fn i2c_matcher() -> Matcher {
    Matcher::Pattern(Regex::new(r"error.*i2c-").unwrap())
}

pub fn smbus_matcher() -> Matcher {
    Matcher::Literal("ERR ismt_smbus".to_string())
}

pub fn timestamp_prefix(line: &str) -> String {
    line.chars().take(PREFIX_LEN).collect()
}

/// Matching-lines-for-pattern-for-day: the one seam between scanning and
/// detection. Pure over an in-memory line iterator so the aggregation logic
/// tests without files.
pub fn day_prefixes<'a, I>(lines: I, matcher: &Matcher, day: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    lines
        .into_iter()
        .filter(|l| matcher.matches(l))
        .map(|l| timestamp_prefix(l))
        .filter(|p| p.contains(day))
        .collect()
}

/// The day's peak burst: among distinct prefixes whose identical-prefix count
/// exceeds the threshold, the one with the largest count. Ties resolve to the
/// lexicographically smallest prefix so repeated runs report the same window.
pub fn detect_burst(prefixes: &[String]) -> Option<BurstRecord> {
    let distinct: BTreeSet<&String> = prefixes.iter().collect();
    let mut best: Option<BurstRecord> = None;
    for prefix in distinct {
        let count = prefixes.iter().filter(|p| *p == prefix).count();
        if count <= BURST_THRESHOLD {
            continue;
        }
        if best.as_ref().is_none_or(|b| count > b.count) {
            best = Some(BurstRecord { prefix: prefix.clone(), count });
        }
    }
    best
}

/// Run the detector for every window day and source, appending each day's
/// result to the owning switch's timeline in day order. `prefixes_for`
/// supplies the matching prefixes for one (source, day) pair.
pub fn aggregate_timelines<F>(
    days: &[String],
    sources: &[(String, std::path::PathBuf)],
    mut prefixes_for: F,
    progress: Option<&indicatif::ProgressBar>,
) -> Timeline
where
    F: FnMut(&Path, &str) -> Vec<String>,
{
    let mut timelines = Timeline::new();
    for day in days {
        for (switch, path) in sources {
            let burst = detect_burst(&prefixes_for(path, day));
            timelines
                .entry(switch.clone())
                .or_default()
                .push(DayBurst { day: day.clone(), burst });
        }
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    timelines
}

/// Raw lines of a log file, gunzipped when the name ends in `.gz`. Non-UTF8
/// bytes are replaced rather than dropped; a missing file yields no lines.
pub fn read_log_lines(path: &Path) -> Vec<String> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("log file {} unavailable: {}", path.display(), e);
            return Vec::new();
        }
    };
    let gz = path.extension().and_then(|e| e.to_str()).map(|s| s.eq_ignore_ascii_case("gz")).unwrap_or(false);
    let reader: Box<dyn Read> = if gz { Box::new(GzDecoder::new(f)) } else { Box::new(f) };
    let mut lines = Vec::new();
    for chunk in BufReader::new(reader).split(b'\n') {
        match chunk {
            Ok(bytes) => lines.push(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                log::warn!("read error in {}: {}", path.display(), e);
                break;
            }
        }
    }
    lines
}

/// Prefixes for one (file, day) pair, the production feed for
/// `aggregate_timelines`.
pub fn file_day_prefixes(path: &Path, matcher: &Matcher, day: &str) -> Vec<String> {
    day_prefixes(read_log_lines(path).iter(), matcher, day)
}
