use regex::Regex;
use std::sync::OnceLock;

// All fixed-format extraction rules live here as named-capture patterns
// returning a typed result or None. The scrapers stay free of ad hoc slicing.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpticsEntry {
    pub interface: String,
    pub model: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelUptime {
    pub model: String,
    pub uptime: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectedRole {
    pub name: String,
    pub connected_since: String,
    pub role: String,
}

fn role_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // rows start with a numeric id; the starred row is the bundle's own controller
    RE.get_or_init(|| Regex::new(r"^\d.*\*.*?(?P<state>[a-z]+)").unwrap())
}

/// State word (`active`/`standby`) of the starred controller row, if this is one.
pub fn controller_state(line: &str) -> Option<String> {
    role_re().captures(line).map(|c| c["state"].to_string())
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Ci job name.*-(?P<version>\d+\.\d+)").unwrap())
}

pub fn software_version(text: &str) -> Option<String> {
    version_re().captures(text).map(|c| c["version"].to_string())
}

fn non_hcl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // interface first, then the model token sitting before the vendor token,
    // anchored on the trailing compliance marker so model length doesn't matter
    RE.get_or_init(|| {
        Regex::new(r"(?P<int>[\w:/]+).*?(?P<model>[\w.+-]+)\s+[\w-]+\s+not approved\s*$").unwrap()
    })
}

/// Interface and model of an inventory line carrying the `not approved` marker.
/// Approved or unmarked lines never match.
pub fn non_hcl_entry(line: &str) -> Option<OpticsEntry> {
    non_hcl_re().captures(line).map(|c| OpticsEntry {
        interface: c["int"].to_string(),
        model: c["model"].to_string(),
    })
}

fn model_uptime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?sm)up\s(?P<uptime>.*?),\s\s.*Model:\s(?P<model>.*?$)").unwrap())
}

pub fn model_uptime(block: &str) -> Option<ModelUptime> {
    model_uptime_re().captures(block).map(|c| ModelUptime {
        model: c["model"].trim().to_string(),
        uptime: c["uptime"].to_string(),
    })
}

fn name_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\w+-]+$").unwrap())
}

/// Switch name, connected-since stamp and role from a `show-switch-all-details`
/// row. The row layout is columnar: name in field 2, the connection stamp in
/// fields 6-7, role in field 14.
pub fn connected_role(line: &str) -> Option<ConnectedRole> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 14 {
        return None;
    }
    let name = fields[1];
    if !name_token_re().is_match(name) {
        return None;
    }
    Some(ConnectedRole {
        name: name.to_string(),
        connected_since: format!("{} {}", fields[5], fields[6]),
        role: fields[13].to_string(),
    })
}

/// Pattern for one month's entries in the audit log. Captures the timestamp
/// field and the command recorded in `args="..."`; built per month because the
/// month string is the anchor.
pub fn audit_re(month: &str) -> Option<Regex> {
    Regex::new(&format!(
        r#"(?P<when>{}.*?00\s).*?id=.*?args="(?P<cmd>.*)""#,
        regex::escape(month)
    ))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_state_starred_rows() {
        assert_eq!(controller_state("1 * 10.0.0.1 active").as_deref(), Some("active"));
        assert_eq!(controller_state("2 * 10.0.0.2 standby").as_deref(), Some("standby"));
        assert_eq!(controller_state("2   10.0.0.2 standby"), None);
        assert_eq!(controller_state("# comment * active"), None);
    }

    #[test]
    fn software_version_from_job_line() {
        let text = "Controller\nCi job name: bcf-master-4.7\nBuild: 123";
        assert_eq!(software_version(text).as_deref(), Some("4.7"));
        assert_eq!(software_version("no version here"), None);
    }

    #[test]
    fn non_hcl_marker_required() {
        let hit = non_hcl_entry("eth1  SFP-10G  vendor-x  not approved").unwrap();
        assert_eq!(hit.interface, "eth1");
        assert_eq!(hit.model, "SFP-10G");
        assert!(non_hcl_entry("eth2  SFP-10G  vendor-y  approved").is_none());
        assert!(non_hcl_entry("").is_none());
    }

    #[test]
    fn non_hcl_tolerates_model_length() {
        let hit = non_hcl_entry("ethernet5/1  QSFP28-100G-LR4+  acme-optics  not approved").unwrap();
        assert_eq!(hit.interface, "ethernet5/1");
        assert_eq!(hit.model, "QSFP28-100G-LR4+");
    }

    #[test]
    fn model_uptime_spans_lines() {
        let block = " 10:21:43 up 172 days,  23:04,  0 users\nHW: rev 2\nModel: S4048-ON";
        let mu = model_uptime(block).unwrap();
        assert_eq!(mu.uptime, "172 days");
        assert_eq!(mu.model, "S4048-ON");
    }

    #[test]
    fn connected_role_columns() {
        let line = "1 RACK1-LEAF1 ok up connected 2023-04-30 11:02:55.0 a b c d e f active extra";
        let cr = connected_role(line).unwrap();
        assert_eq!(cr.name, "RACK1-LEAF1");
        assert_eq!(cr.connected_since, "2023-04-30 11:02:55.0");
        assert_eq!(cr.role, "active");
        assert!(connected_role("short row").is_none());
    }

    #[test]
    fn audit_pattern_extracts_command() {
        let re = audit_re("2023-04").unwrap();
        let line = r#"2023-04-22T11:26:28.479+00:00 host cli: id=42 user="admin" args="show fabric error""#;
        let caps = re.captures(line).unwrap();
        assert!(caps["when"].starts_with("2023-04-22T"));
        assert_eq!(&caps["cmd"], "show fabric error");
        assert!(re.captures("2023-05-01 id=1 args=\"x\"").is_none());
    }
}
