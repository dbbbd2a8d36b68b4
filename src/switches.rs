use crate::burst::read_log_lines;
use crate::{asic, patterns};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Suffix marker of per-switch dump files in the bundle main directory; the
/// part before it is the switch name.
pub const LINK_LOCAL_MARKER: &str = "-fe80";

pub const SHOW_SWITCH_ALL_DETAILS: &str = "cli/show-switch-all-details";

#[derive(Clone, Debug, Serialize)]
pub struct SwitchDetails {
    pub name: String,
    pub model: String,
    pub uptime: String,
    pub asic: String,
    pub connected_since: String,
    pub role: String,
}

/// Per-switch dump files in the bundle main directory (the parent of the
/// controller directory). Customer-created files are skipped by requiring the
/// link-local marker in the name.
pub fn switch_files(main_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(main_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.contains("-fe80::"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Switch name from a dump file path: the file name up to the link-local
/// marker.
pub fn switch_name(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match name.find(LINK_LOCAL_MARKER) {
        Some(idx) => name[..idx].to_string(),
        None => name.to_string(),
    }
}

/// Switch name from a shared `var/log/switch` file: the file stem up to the
/// first dot (`RACK1-LEAF1.log.gz` → `RACK1-LEAF1`).
pub fn switch_log_stem(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.split('.').next().unwrap_or(name).to_string()
}

fn model_uptime_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Model|uptime").unwrap())
}

// grep -A 2 over the dump: matching lines plus the two following each
fn model_uptime_block(lines: &[String]) -> String {
    let mut keep = vec![false; lines.len()];
    for (i, line) in lines.iter().enumerate() {
        if model_uptime_line_re().is_match(line) {
            let end = (i + 2).min(lines.len().saturating_sub(1));
            for flag in keep.iter_mut().take(end + 1).skip(i) {
                *flag = true;
            }
        }
    }
    lines
        .iter()
        .zip(keep)
        .filter(|(_, k)| *k)
        .map(|(l, _)| l.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// One row per switch with a parseable model/uptime block; switches without
/// one are omitted rather than reported half-empty. Connected-since and role
/// come from the controller's `show-switch-all-details` table, matched by
/// switch name.
pub fn collect_details(switch_paths: &[PathBuf], ctrl: &Path) -> Vec<SwitchDetails> {
    let detail_lines = read_log_lines(&ctrl.join(SHOW_SWITCH_ALL_DETAILS));
    let mut rows = Vec::new();
    for path in switch_paths {
        let name = switch_name(path);
        let block = model_uptime_block(&read_log_lines(path));
        let Some(mu) = patterns::model_uptime(&block) else {
            log::info!("no model/uptime block for switch {}", name);
            continue;
        };
        let asic = asic::asic_for_model(&mu.model).unwrap_or("").to_string();
        let mut connected_since = String::new();
        let mut role = String::new();
        for line in &detail_lines {
            if let Some(cr) = patterns::connected_role(line)
                && cr.name == name
            {
                connected_since = cr.connected_since;
                role = cr.role;
            }
        }
        rows.push(SwitchDetails {
            name,
            model: mu.model,
            uptime: mu.uptime,
            asic,
            connected_since,
            role,
        });
    }
    rows
}
