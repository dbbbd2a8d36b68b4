use crate::patterns;
use std::collections::BTreeMap;

/// Header of the pluggable-optics section inside a switch dump.
pub const SECTION_MARKER: &str = "inventory hcl";
/// Lines kept after each section header, grep `-A 100` style.
pub const SECTION_SPAN: usize = 100;

/// Interface → models found non-compliant, for one switch dump. Dumps without
/// an inventory section, and lines without the marker, contribute nothing.
pub fn scan_optics(lines: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in inventory_section(lines) {
        if let Some(entry) = patterns::non_hcl_entry(line) {
            out.entry(entry.interface).or_default().push(entry.model);
        }
    }
    out
}

fn inventory_section(lines: &[String]) -> Vec<&String> {
    let mut keep = vec![false; lines.len()];
    for (i, line) in lines.iter().enumerate() {
        if line.contains(SECTION_MARKER) {
            let end = (i + SECTION_SPAN).min(lines.len().saturating_sub(1));
            for flag in keep.iter_mut().take(end + 1).skip(i) {
                *flag = true;
            }
        }
    }
    lines.iter().zip(keep).filter(|(_, k)| *k).map(|(l, _)| l).collect()
}
