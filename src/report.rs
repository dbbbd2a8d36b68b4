use crate::burst::Timeline;
use crate::controller::AuditMonth;
use crate::switches::SwitchDetails;
use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

const NONE_MSG: &str = "               None";
const TILDE_RULE: &str = "~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~";

pub type OpticsMap = BTreeMap<String, BTreeMap<String, Vec<String>>>;
pub type FirmwareMap = BTreeMap<String, BTreeMap<String, usize>>;

/// Everything the analysis produced for one active controller; rendered to
/// the per-controller text report, or serialized as-is for `--output json`.
#[derive(Clone, Debug, Serialize)]
pub struct ControllerReport {
    pub controller: String,
    pub bundle_date: String,
    pub bundle_time: String,
    pub fabric_errors: Option<String>,
    pub i2c_timelines: Timeline,
    pub smbus_timelines: Timeline,
    pub non_hcl_optics: OpticsMap,
    pub firmware_errors: FirmwareMap,
    pub switch_details: Vec<SwitchDetails>,
    pub audit_months: Vec<AuditMonth>,
}

pub fn write_report(path: &Path, report: &ControllerReport) -> Result<()> {
    std::fs::write(path, render_text(report))
        .with_context(|| format!("cannot write report {}", path.display()))
}

pub fn render_text(report: &ControllerReport) -> String {
    let mut out = String::new();
    if let Some(errors) = report.fabric_errors.as_ref() {
        push_header(&mut out, "FABRIC ERRORS");
        out.push_str(errors);
        out.push_str("\n\n");
    }
    push_header(
        &mut out,
        "The switches with continuously incrementing i2c errors and the timeframe when maximum errors happened are below:",
    );
    push_timeline(&mut out, &report.i2c_timelines);
    push_header(
        &mut out,
        "The switches with continuously incrementing 'ERR ismt_smbus' and the timeframe when maximum errors happened are below:",
    );
    push_timeline(&mut out, &report.smbus_timelines);
    push_header(&mut out, "The switches with non HCL optics are below:");
    push_optics(&mut out, &report.non_hcl_optics);
    push_header(
        &mut out,
        "The switches with errors under ofad-debug logs are below. The format is [number of occurrences] - error message",
    );
    push_firmware(&mut out, &report.firmware_errors);
    push_header(
        &mut out,
        "The switches and their model number, uptime, ASIC, connection duration and role are below:",
    );
    out.push_str(&details_table(&report.switch_details));
    out.push('\n');
    push_header(&mut out, "The audit logs for the current and last month are below:");
    push_audit(&mut out, &report.audit_months);
    out
}

fn push_header(out: &mut String, msg: &str) {
    out.push('\n');
    out.push_str(&format!("<------- {} -------->", msg));
    out.push_str("\n\n\n");
}

fn centered_row(cells: &[&str]) -> Vec<Cell> {
    cells.iter().map(|c| Cell::new(c).set_alignment(CellAlignment::Center)).collect()
}

// switch → the burst prefixes of its window, skipping burst-free switches
fn push_timeline(out: &mut String, timeline: &Timeline) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(centered_row(&["Switch name", "Timeframe of errors"]));
    let mut rows = 0;
    for (switch, days) in timeline {
        let prefixes: Vec<String> = days
            .iter()
            .filter_map(|d| d.burst.as_ref().map(|b| b.prefix.clone()))
            .collect();
        if prefixes.is_empty() {
            continue;
        }
        table.add_row(centered_row(&[switch, &prefixes.join(", ")]));
        rows += 1;
    }
    if rows == 0 {
        out.push_str(NONE_MSG);
        out.push('\n');
    } else {
        out.push_str(&table.to_string());
        out.push('\n');
    }
}

fn push_optics(out: &mut String, optics: &OpticsMap) {
    if optics.is_empty() {
        out.push_str(NONE_MSG);
        out.push('\n');
        return;
    }
    for (switch, interfaces) in optics {
        push_switch_banner(out, switch);
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(centered_row(&["Interface", "Model"]));
        for (interface, models) in interfaces {
            table.add_row(centered_row(&[interface, &models.join(", ")]));
        }
        out.push_str(&table.to_string());
        out.push('\n');
    }
}

fn push_firmware(out: &mut String, firmware: &FirmwareMap) {
    if firmware.is_empty() {
        out.push_str(NONE_MSG);
        out.push('\n');
        return;
    }
    for (switch, errors) in firmware {
        push_switch_banner(out, switch);
        for (message, count) in errors {
            out.push_str(&format!("[{:^5}] - {}\n", count, message));
        }
    }
}

fn push_switch_banner(out: &mut String, switch: &str) {
    out.push_str(TILDE_RULE);
    out.push('\n');
    out.push_str(&format!("     Switch: {}\n", switch));
    out.push_str(TILDE_RULE);
    out.push('\n');
}

fn details_table(rows: &[SwitchDetails]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(centered_row(&[
        "Switch Name",
        "Model",
        "Uptime",
        "ASIC type",
        "Connected since",
        "Role",
    ]));
    for r in rows {
        table.add_row(centered_row(&[
            &r.name,
            &r.model,
            &r.uptime,
            &r.asic,
            &r.connected_since,
            &r.role,
        ]));
    }
    table.to_string()
}

fn push_audit(out: &mut String, months: &[AuditMonth]) {
    for (i, month) in months.iter().enumerate() {
        let label = if i == 0 { "<---- Commands for the last month" } else { "<---- Commands for the current month" };
        if i > 0 {
            out.push('\n');
        }
        out.push_str(label);
        out.push_str("\n\n");
        if month.commands.is_empty() {
            out.push_str("~~~~~ No commands executed ~~~~~\n");
        } else {
            for (when, cmd) in &month.commands {
                out.push_str(&format!("{} {}\n", when.trim_end(), cmd));
            }
        }
    }
}

/// Switch-details rows as CSV, same columns as the report table.
pub fn write_details_csv(path: &Path, rows: &[SwitchDetails]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("cannot write CSV {}", path.display()))?;
    w.write_record(["Switch Name", "Model", "Uptime", "ASIC type", "Connected since", "Role"])?;
    for r in rows {
        w.write_record([&r.name, &r.model, &r.uptime, &r.asic, &r.connected_since, &r.role])?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burst::{BurstRecord, DayBurst};

    fn sample_report() -> ControllerReport {
        let mut i2c = Timeline::new();
        i2c.insert(
            "SW1".to_string(),
            vec![
                DayBurst { day: "2023-05-01".to_string(), burst: Some(BurstRecord { prefix: "2023-05-01T10:0".to_string(), count: 7 }) },
                DayBurst { day: "2023-05-02".to_string(), burst: None },
            ],
        );
        i2c.insert(
            "SW2".to_string(),
            vec![DayBurst { day: "2023-05-01".to_string(), burst: None }],
        );
        let mut optics = OpticsMap::new();
        let mut ifaces = BTreeMap::new();
        ifaces.insert("eth1".to_string(), vec!["SFP-10G".to_string()]);
        optics.insert("SW1".to_string(), ifaces);
        let mut firmware = FirmwareMap::new();
        let mut errs = BTreeMap::new();
        errs.insert("ofad error [sfp] eeprom read failed".to_string(), 12);
        firmware.insert("SW1".to_string(), errs);
        ControllerReport {
            controller: "CTRL1".to_string(),
            bundle_date: "2023-05-07".to_string(),
            bundle_time: "09-22-52Z".to_string(),
            fabric_errors: Some("~ Suspended switches ~\nRACK2 suspended".to_string()),
            i2c_timelines: i2c,
            smbus_timelines: Timeline::new(),
            non_hcl_optics: optics,
            firmware_errors: firmware,
            switch_details: vec![SwitchDetails {
                name: "SW1".to_string(),
                model: "S4048-ON".to_string(),
                uptime: "172 days".to_string(),
                asic: "Trident 2".to_string(),
                connected_since: "2023-04-30 11:02:55.0".to_string(),
                role: "active".to_string(),
            }],
            audit_months: vec![
                AuditMonth { month: "2023-04".to_string(), commands: vec![] },
                AuditMonth {
                    month: "2023-05".to_string(),
                    commands: vec![("2023-05-02T08:00:00.000+00:00 ".to_string(), "show switch all".to_string())],
                },
            ],
        }
    }

    #[test]
    fn report_carries_all_sections() {
        let text = render_text(&sample_report());
        assert!(text.contains("<------- FABRIC ERRORS -------->"));
        assert!(text.contains("incrementing i2c errors"));
        assert!(text.contains("ERR ismt_smbus"));
        assert!(text.contains("non HCL optics"));
        assert!(text.contains("ofad-debug logs"));
        assert!(text.contains("model number, uptime, ASIC"));
        assert!(text.contains("audit logs"));
    }

    #[test]
    fn timeline_rows_skip_burst_free_switches() {
        let text = render_text(&sample_report());
        assert!(text.contains("2023-05-01T10:0"));
        assert!(text.contains("SW1"));
        let i2c_section = text.split("ERR ismt_smbus").next().unwrap();
        assert!(!i2c_section.contains("SW2"));
    }

    #[test]
    fn empty_timeline_renders_none() {
        let text = render_text(&sample_report());
        let smbus_section: &str = text.split("ERR ismt_smbus").nth(1).unwrap();
        assert!(smbus_section.contains("None"));
    }

    #[test]
    fn firmware_counts_are_bracketed() {
        let text = render_text(&sample_report());
        assert!(text.contains("[ 12  ] - ofad error [sfp] eeprom read failed"));
    }

    #[test]
    fn audit_months_labelled() {
        let text = render_text(&sample_report());
        assert!(text.contains("Commands for the last month"));
        assert!(text.contains("~~~~~ No commands executed ~~~~~"));
        assert!(text.contains("Commands for the current month"));
        assert!(text.contains("show switch all"));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let p = std::env::temp_dir().join("fabdoctor_details.csv");
        write_details_csv(&p, &sample_report().switch_details).unwrap();
        let data = std::fs::read_to_string(&p).unwrap();
        assert!(data.starts_with("Switch Name,Model"));
        assert!(data.contains("S4048-ON"));
        let _ = std::fs::remove_file(&p);
    }
}
