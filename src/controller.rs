use crate::burst::read_log_lines;
use crate::patterns;
use chrono::{Datelike, Duration, NaiveDate};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

pub const SHOW_CONTROLLER_DETAILS: &str = "cli/show-controller-details";
pub const SHOW_VERSION_DETAILS: &str = "cli/show-version-details";
pub const AUDIT_LOG: &str = "var/log/floodlight/audit.log";
pub const SWITCH_LOG_DIR: &str = "var/log/switch";

/// Length of the scan window in calendar days, bundle collection date
/// included.
pub const WINDOW_DAYS: i64 = 7;

/// Controller directories whose `show-controller-details` marks them with the
/// wanted state (`active` or `standby`).
pub fn find_controller_roles(state: &str, ctrl_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for ctrl in ctrl_dirs {
        let details = ctrl.join(SHOW_CONTROLLER_DETAILS);
        for line in read_log_lines(&details) {
            if let Some(s) = patterns::controller_state(&line)
                && s == state
            {
                found.push(ctrl.clone());
                break;
            }
        }
    }
    found
}

pub fn software_version(ctrl: &Path) -> Option<String> {
    let path = ctrl.join(SHOW_VERSION_DETAILS);
    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("version output {} unavailable: {}", path.display(), e);
            return None;
        }
    };
    patterns::software_version(&text)
}

/// On 5.x the collected filesystem lives under `files/` inside the controller
/// directory; earlier releases keep it at the top.
pub fn files_root(ctrl: &Path) -> PathBuf {
    match software_version(ctrl) {
        Some(v) if v.starts_with('5') => ctrl.join("files"),
        _ => ctrl.to_path_buf(),
    }
}

fn bundle_dir_name(ctrl: &Path) -> Option<String> {
    ctrl.parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
}

/// Collection date and time parsed from the bundle directory name, which has
/// the shape `<prefix>--<controller>--<date>--<time>--...`.
pub fn bundle_stamp(ctrl: &Path) -> Option<(String, String)> {
    let name = bundle_dir_name(ctrl)?;
    let parts: Vec<&str> = name.split("--").collect();
    if parts.len() < 4 {
        log::warn!("unexpected bundle directory name: {}", name);
        return None;
    }
    Some((parts[2].to_string(), parts[3].to_string()))
}

/// Controller name segment of the bundle directory name.
pub fn controller_name(ctrl: &Path) -> Option<String> {
    bundle_dir_name(ctrl)?.split("--").nth(1).map(|s| s.to_string())
}

/// Report file name: `case-<num>-<controller>-<date>-<time>.log`, or without
/// the case prefix when the input was a bare path.
pub fn report_file_name(ctrl: &Path, case_num: Option<&str>) -> Option<String> {
    let name = bundle_dir_name(ctrl)?;
    let parts: Vec<&str> = name.split("--").collect();
    if parts.len() < 4 {
        return None;
    }
    let base = format!("{}-{}-{}.log", parts[1], parts[2], parts[3]);
    Some(match case_num {
        Some(n) => format!("case-{}-{}", n, base),
        None => base,
    })
}

/// The 7 calendar days ending at the bundle collection date, oldest first,
/// as `YYYY-MM-DD` strings. Never derived from wall-clock now.
pub fn last_seven_days(bundle_date: &str) -> Option<Vec<String>> {
    let end = NaiveDate::parse_from_str(bundle_date, "%Y-%m-%d").ok()?;
    Some(
        (0..WINDOW_DAYS)
            .rev()
            .map(|i| (end - Duration::days(i)).format("%Y-%m-%d").to_string())
            .collect(),
    )
}

/// Previous month and bundle month as `YYYY-MM` strings, for the audit scan.
pub fn month_pair(bundle_date: &str) -> Option<(String, String)> {
    let bd = NaiveDate::parse_from_str(bundle_date, "%Y-%m-%d").ok()?;
    let first = bd.with_day0(0)?;
    let prev = first - Duration::days(1);
    Some((prev.format("%Y-%m").to_string(), bd.format("%Y-%m").to_string()))
}

fn switch_log_glob(pattern: &str) -> Option<GlobSet> {
    let mut gs = GlobSetBuilder::new();
    let glob = GlobBuilder::new(pattern).case_insensitive(true).build().ok()?;
    gs.add(glob);
    gs.build().ok()
}

/// Files under the controller's shared `var/log/switch/` directory. `None`
/// when the directory itself is absent, which skips the smbus scan cleanly.
pub fn switch_log_files(files_root: &Path, glob_pattern: &str) -> Option<Vec<PathBuf>> {
    let dir = files_root.join(SWITCH_LOG_DIR);
    let entries = std::fs::read_dir(&dir).ok()?;
    let set = switch_log_glob(glob_pattern);
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| match (&set, p.file_name().and_then(|n| n.to_str())) {
            (Some(s), Some(name)) => s.is_match(name),
            (None, _) => true,
            (_, None) => false,
        })
        .collect();
    files.sort();
    Some(files)
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct AuditMonth {
    pub month: String,
    pub commands: Vec<(String, String)>,
}

/// Commands executed in the previous and bundle month, read from the
/// floodlight audit log. Blank commands (bare enter, whitespace) are skipped.
pub fn audit_commands(files_root: &Path, months: &(String, String)) -> Vec<AuditMonth> {
    let path = files_root.join(AUDIT_LOG);
    let lines = read_log_lines(&path);
    let mut out = Vec::new();
    for month in [&months.0, &months.1] {
        let mut commands = Vec::new();
        if let Some(re) = patterns::audit_re(month) {
            for line in &lines {
                if let Some(caps) = re.captures(line) {
                    let cmd = caps["cmd"].trim();
                    if !cmd.is_empty() {
                        commands.push((caps["when"].to_string(), cmd.to_string()));
                    }
                }
            }
        }
        out.push(AuditMonth { month: month.clone(), commands });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let d = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&d);
        fs::create_dir_all(&d).unwrap();
        d
    }

    #[test]
    fn window_is_seven_days_oldest_first() {
        let days = last_seven_days("2023-05-07").unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], "2023-05-01");
        assert_eq!(days[6], "2023-05-07");
    }

    #[test]
    fn window_crosses_month_boundary() {
        let days = last_seven_days("2023-05-02").unwrap();
        assert_eq!(days[0], "2023-04-26");
        assert_eq!(days[6], "2023-05-02");
        assert!(last_seven_days("not-a-date").is_none());
    }

    #[test]
    fn month_pair_handles_january() {
        assert_eq!(
            month_pair("2023-01-15").unwrap(),
            ("2022-12".to_string(), "2023-01".to_string())
        );
        assert_eq!(
            month_pair("2023-05-07").unwrap(),
            ("2023-04".to_string(), "2023-05".to_string())
        );
    }

    #[test]
    fn bundle_stamp_from_directory_name() {
        let ctrl = PathBuf::from("/tmp/bsn-support--CTRL1--2023-05-07--09-22-52Z--SXI8I/CTRL1-aabb/");
        let (d, t) = bundle_stamp(&ctrl).unwrap();
        assert_eq!(d, "2023-05-07");
        assert_eq!(t, "09-22-52Z");
        assert_eq!(
            report_file_name(&ctrl, Some("11411")).unwrap(),
            "case-11411-CTRL1-2023-05-07-09-22-52Z.log"
        );
        assert_eq!(
            report_file_name(&ctrl, None).unwrap(),
            "CTRL1-2023-05-07-09-22-52Z.log"
        );
    }

    #[test]
    fn roles_need_star_and_state() {
        let root = scratch("fabdoctor_roles");
        let a = root.join("ctrl-a");
        let b = root.join("ctrl-b");
        fs::create_dir_all(a.join("cli")).unwrap();
        fs::create_dir_all(b.join("cli")).unwrap();
        fs::write(a.join(SHOW_CONTROLLER_DETAILS), "# id host state\n1 * 10.0.0.1 active\n2 10.0.0.2 standby\n").unwrap();
        fs::write(b.join(SHOW_CONTROLLER_DETAILS), "# id host state\n1 10.0.0.1 active\n2 * 10.0.0.2 standby\n").unwrap();
        let dirs = vec![a.clone(), b.clone()];
        let active = find_controller_roles("active", &dirs);
        assert_eq!(active, vec![a]);
        let standby = find_controller_roles("standby", &dirs);
        assert_eq!(standby, vec![b]);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn files_root_shifts_on_five_x() {
        let root = scratch("fabdoctor_files_root");
        fs::create_dir_all(root.join("cli")).unwrap();
        fs::write(root.join(SHOW_VERSION_DETAILS), "Ci job name: bcf-5.1\n").unwrap();
        assert_eq!(files_root(&root), root.join("files"));
        fs::write(root.join(SHOW_VERSION_DETAILS), "Ci job name: bcf-4.7\n").unwrap();
        assert_eq!(files_root(&root), root);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn absent_switch_log_dir_is_none() {
        let root = scratch("fabdoctor_swlog");
        assert!(switch_log_files(&root, "*.log*").is_none());
        let dir = root.join(SWITCH_LOG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("RACK1-LEAF1.log"), "x\n").unwrap();
        fs::write(dir.join("RACK1-LEAF1.log.gz"), "x\n").unwrap();
        fs::write(dir.join("README"), "x\n").unwrap();
        let files = switch_log_files(&root, "*.log*").unwrap();
        assert_eq!(files.len(), 2);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn audit_commands_split_by_month() {
        let root = scratch("fabdoctor_audit");
        let dir = root.join("var/log/floodlight");
        fs::create_dir_all(&dir).unwrap();
        let log = concat!(
            "2023-04-22T11:26:28.479+00:00 host cli: id=1 user=\"admin\" args=\"show fabric error\"\n",
            "2023-05-02T08:00:00.000+00:00 host cli: id=2 user=\"admin\" args=\"show switch all\"\n",
            "2023-05-02T08:00:05.000+00:00 host cli: id=3 user=\"admin\" args=\"  \"\n",
        );
        fs::write(dir.join("audit.log"), log).unwrap();
        let months = ("2023-04".to_string(), "2023-05".to_string());
        let got = audit_commands(&root, &months);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].commands.len(), 1);
        assert_eq!(got[0].commands[0].1, "show fabric error");
        assert_eq!(got[1].commands.len(), 1);
        assert_eq!(got[1].commands[0].1, "show switch all");
        let _ = fs::remove_dir_all(&root);
    }
}
