use crate::report::{ControllerReport, FirmwareMap, OpticsMap};
use crate::{burst, controller, fabric, firmware, optics, paint, switches};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const STATUS_WIDTH: usize = 50;

pub struct CheckOptions {
    pub progress: bool,
    pub quiet: bool,
    pub switch_log_glob: String,
    pub report_dir: PathBuf,
}

fn say(opts: &CheckOptions, msg: &str) {
    if !opts.quiet {
        println!("{}", msg);
    }
}

fn status(opts: &CheckOptions, check: &str, result: &str) {
    let mut line = check.to_string();
    while line.chars().count() < STATUS_WIDTH {
        line.push('.');
    }
    say(opts, &format!("{} {}", line, result));
}

fn progress_bar(opts: &CheckOptions, len: usize) -> Option<indicatif::ProgressBar> {
    if opts.progress { Some(indicatif::ProgressBar::new(len as u64)) } else { None }
}

/// Run the whole checklist for one active controller and write its report
/// file. Every per-switch/per-day failure inside is absorbed into an empty
/// contribution; only an unusable bundle directory aborts.
pub fn run_checklist(
    ctrl: &Path,
    case_num: Option<&str>,
    opts: &CheckOptions,
) -> Result<(ControllerReport, PathBuf)> {
    let (bundle_date, bundle_time) = controller::bundle_stamp(ctrl)
        .with_context(|| format!("cannot read bundle stamp for {}", ctrl.display()))?;
    let banner = format!("Analyzing the bundle collected on {} at {}", bundle_date, bundle_time);
    say(opts, "");
    say(opts, &banner);
    say(opts, &"~".repeat(banner.chars().count()));
    say(opts, "");

    let days = controller::last_seven_days(&bundle_date)
        .with_context(|| format!("bundle date {} is not YYYY-MM-DD", bundle_date))?;

    let fabric_errors = fabric::fabric_errors(ctrl);
    let verdict = if fabric_errors.is_some() { "errors found" } else { "No errors found" };
    status(opts, "Checking for Fabric errors", verdict);

    let main_dir = ctrl
        .parent()
        .with_context(|| format!("controller directory {} has no parent", ctrl.display()))?;
    let switch_paths = switches::switch_files(main_dir);
    let files_root = controller::files_root(ctrl);

    say(opts, "Checking for continuous switch i2c errors for the last 7 days...");
    let console_sources: Vec<(String, PathBuf)> = switch_paths
        .iter()
        .map(|p| (switches::switch_name(p), p.clone()))
        .collect();
    let i2c_matcher = burst::i2c_matcher();
    let pb = progress_bar(opts, days.len());
    let i2c_timelines = burst::aggregate_timelines(
        &days,
        &console_sources,
        |path, day| burst::file_day_prefixes(path, &i2c_matcher, day),
        pb.as_ref(),
    );
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    say(opts, "Checking for continuous switch smbus errors for the last 7 days...");
    let smbus_timelines = match controller::switch_log_files(&files_root, &opts.switch_log_glob) {
        Some(files) => {
            let shared_sources: Vec<(String, PathBuf)> = files
                .iter()
                .map(|p| (switches::switch_log_stem(p), p.clone()))
                .collect();
            let smbus_matcher = burst::smbus_matcher();
            let pb = progress_bar(opts, days.len());
            let timelines = burst::aggregate_timelines(
                &days,
                &shared_sources,
                |path, day| burst::file_day_prefixes(path, &smbus_matcher, day),
                pb.as_ref(),
            );
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            timelines
        }
        None => {
            say(opts, &paint("...No switch logs found under /var/log/switch/...", "33"));
            log::info!("{} absent, smbus scan skipped", files_root.join(controller::SWITCH_LOG_DIR).display());
            burst::Timeline::new()
        }
    };

    say(opts, "Checking for non HCL optics for the switches...");
    let mut non_hcl_optics = OpticsMap::new();
    let pb = progress_bar(opts, switch_paths.len());
    for path in &switch_paths {
        let found = optics::scan_optics(&burst::read_log_lines(path));
        if !found.is_empty() {
            non_hcl_optics.insert(switches::switch_name(path), found);
        }
        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    say(opts, "Checking for ofad errors on the switches for the last 7 days...");
    let mut firmware_errors = FirmwareMap::new();
    let pb = progress_bar(opts, switch_paths.len());
    for path in &switch_paths {
        let found = firmware::scan_firmware_errors(&burst::read_log_lines(path), &days);
        if !found.is_empty() {
            firmware_errors.insert(switches::switch_name(path), found);
        }
        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let switch_details = switches::collect_details(&switch_paths, ctrl);

    let audit_months = match controller::month_pair(&bundle_date) {
        Some(months) => controller::audit_commands(&files_root, &months),
        None => Vec::new(),
    };

    let report = ControllerReport {
        controller: controller::controller_name(ctrl).unwrap_or_default(),
        bundle_date,
        bundle_time,
        fabric_errors,
        i2c_timelines,
        smbus_timelines,
        non_hcl_optics,
        firmware_errors,
        switch_details,
        audit_months,
    };

    let file_name = controller::report_file_name(ctrl, case_num)
        .with_context(|| format!("cannot derive report name for {}", ctrl.display()))?;
    let report_path = opts.report_dir.join(file_name);
    crate::report::write_report(&report_path, &report)?;
    say(opts, ".....Done.....");
    say(opts, "");
    Ok((report, report_path))
}
