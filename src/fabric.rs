use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn section_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^~\s.*~\s*$").unwrap())
}

/// The interesting part of `show-fabric-error` output: everything left after
/// dropping benign `~ <section> ~` / `None.` pairs and blank lines. `None`
/// means the fabric is clean. An unreadable file also reads as clean, logged
/// for the operator.
pub fn fabric_errors(ctrl: &Path) -> Option<String> {
    let path = ctrl.join("cli/show-fabric-error");
    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("fabric error output {} unavailable: {}", path.display(), e);
            return None;
        }
    };
    let remainder = scrub_benign_sections(&text);
    if remainder.is_empty() { None } else { Some(remainder) }
}

/// Remove section headers whose body is just `None.`; keep the rest verbatim.
pub fn scrub_benign_sections(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut keep = vec![true; lines.len()];
    for i in 0..lines.len() {
        if !section_header_re().is_match(lines[i]) {
            continue;
        }
        let body_is_none = lines
            .get(i + 1)
            .map(|l| matches!(l.trim(), "None." | "None"))
            .unwrap_or(false);
        if body_is_none {
            keep[i] = false;
            keep[i + 1] = false;
        }
    }
    lines
        .iter()
        .zip(keep)
        .filter(|(l, k)| *k && !l.trim().is_empty())
        .map(|(l, _)| *l)
        .collect::<Vec<_>>()
        .join("\n")
}
