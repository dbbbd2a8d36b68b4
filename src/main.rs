use anyhow::{Result, bail};
use clap::{ArgAction, ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;
mod asic;
mod bundle;
mod burst;
mod checks;
mod controller;
mod fabric;
mod firmware;
mod optics;
mod patterns;
mod report;
mod switches;

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
enum OutputFmt { Text, Json }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Parser, Debug)]
#[command(
    name = "FabDoctor",
    about = "Support bundle analyzer and per-controller diagnostic reporter",
    long_about = "Support bundle analyzer that locates the active controller inside a fabric support bundle, scans switch logs for fabric errors, i2c/smbus error bursts, non-HCL optics and firmware errors, and writes one diagnostic report per controller.",
    after_long_help = "Examples:\n  FabDoctor --case-num 11705\n  FabDoctor -c 11705 --report-dir /tmp/reports --progress\n  FabDoctor --path ~/support/acme-dc1 --output json\n  FabDoctor -p /home/bsn/support/acme-dc1 --csv-path switches.csv",
    color = ColorChoice::Auto
)]
struct Args {
    /// Case number to look up under the support root
    #[arg(long, short = 'c', conflicts_with = "path")]
    case_num: Option<String>,
    /// Path to a support bundle directory
    #[arg(long, short = 'p')]
    path: Option<String>,
    #[arg(long, default_value = bundle::DEFAULT_SUPPORT_ROOT)]
    support_root: String,
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFmt,
    /// Directory the per-controller report files are written to
    #[arg(long, default_value = ".")]
    report_dir: String,
    #[arg(long)]
    csv_path: Option<String>,
    /// Glob for files under the shared var/log/switch directory
    #[arg(long, default_value = "*.log*")]
    switch_log_glob: String,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long, default_value_t = false)]
    progress: bool,
    #[arg(long)]
    config: Option<String>,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
}

#[derive(Deserialize)]
struct AppConfig {
    support_root: Option<String>,
    output: Option<OutputFmt>,
    report_dir: Option<String>,
    csv_path: Option<String>,
    switch_log_glob: Option<String>,
    progress: Option<bool>,
    force_color: Option<bool>,
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() {
            if let Ok(mut f) = std::fs::File::create(path) { clap_complete::generate(sh, &mut cmd, "FabDoctor", &mut f); } else { clap_complete::generate(sh, &mut cmd, "FabDoctor", &mut std::io::stdout()); }
        } else {
            clap_complete::generate(sh, &mut cmd, "FabDoctor", &mut std::io::stdout());
        }
        return;
    }
    if let Some(p) = args.config.as_ref()
        && let Ok(s) = std::fs::read_to_string(p)
        && let Ok(cfg) = toml::from_str::<AppConfig>(&s) { apply_config(&mut args, cfg); }
    else {
        let def = "FabDoctor.toml";
        if let Ok(s) = std::fs::read_to_string(def)
            && let Ok(cfg) = toml::from_str::<AppConfig>(&s) { apply_config(&mut args, cfg); }
    }
    {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if args.quiet {
            builder.filter_level(log::LevelFilter::Error);
        } else if let Some(lvl) = args.log_level {
            let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
            builder.filter_level(f);
        } else if args.verbose > 0 {
            let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
            builder.filter_level(f);
        }
        builder.init();
    }
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let enable_color = if args.force_color { true } else { color_default && !args.no_color };
    let _ = ENABLE_COLOR.set(enable_color);
    if let Err(e) = run(&args) {
        eprintln!("{}", paint(&format!("### ERROR ### {:#}", e), "1;31"));
        std::process::exit(1);
    }
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.support_root == bundle::DEFAULT_SUPPORT_ROOT && let Some(v) = cfg.support_root { args.support_root = v; }
    if let Some(v) = cfg.output { args.output = v; }
    if args.report_dir == "." && let Some(v) = cfg.report_dir { args.report_dir = v; }
    if args.csv_path.is_none() && let Some(v) = cfg.csv_path { args.csv_path = Some(v); }
    if args.switch_log_glob == "*.log*" && let Some(v) = cfg.switch_log_glob { args.switch_log_glob = v; }
    if let Some(v) = cfg.progress { args.progress = v; }
    if let Some(v) = cfg.force_color { args.force_color = v; }
}

fn run(args: &Args) -> Result<()> {
    let started = Instant::now();
    let quiet = args.quiet;
    let say = |msg: &str| { if !quiet { println!("{}", msg); } };

    let locations: Vec<PathBuf> = if let Some(case) = args.case_num.as_ref() {
        say("Checking if support bundle exists...");
        let found = bundle::case_directories(Path::new(&args.support_root), case);
        if found.is_empty() {
            bail!("the directory with case number {} is not found under {}, the support bundle has not been uploaded", case, args.support_root);
        }
        found
    } else if let Some(p) = args.path.as_ref() {
        say("Checking if the path exists...");
        vec![bundle::validate_bundle_dir(&bundle::expand_user_path(p))?]
    } else {
        bail!("provide either --case-num or --path");
    };

    if locations.len() == 1 {
        say("Support bundle found at the following location");
    } else {
        say("Multiple support bundle directories found for the same case number at the following locations");
    }
    for loc in &locations {
        say(&format!("-----> {}", loc.display()));
    }

    let opts = checks::CheckOptions {
        progress: args.progress,
        quiet: args.quiet,
        switch_log_glob: args.switch_log_glob.clone(),
        report_dir: PathBuf::from(&args.report_dir),
    };
    let mut reports: Vec<report::ControllerReport> = Vec::new();
    let mut report_files: Vec<PathBuf> = Vec::new();
    for location in &locations {
        let (ctrl_dirs, num_bundles) = bundle::controller_directories(location);
        if ctrl_dirs.is_empty() {
            bail!(
                "no cli directory under the controller directories at {}, the bundle could be corrupted, try untarring it again or ask for a re-upload",
                location.display()
            );
        }
        say("");
        say(&format!("Now analyzing the location {} ...", location.display()));
        if num_bundles > 1 {
            say(&format!("It looks like there are more than one support bundles at {}", location.display()));
            say("All bundles will be analyzed.");
        }
        let active = controller::find_controller_roles("active", &ctrl_dirs);
        if active.is_empty() {
            say(&paint("No Active controller directory found", "33"));
            log::warn!("no active controller under {}", location.display());
            continue;
        }
        for ctrl in &active {
            say(&format!("The Active controller is at {}", ctrl.display()));
            say("");
            let (rep, path) = checks::run_checklist(ctrl, args.case_num.as_deref(), &opts)?;
            reports.push(rep);
            report_files.push(path);
        }
    }

    if let Some(p) = args.csv_path.as_ref() {
        let rows: Vec<switches::SwitchDetails> =
            reports.iter().flat_map(|r| r.switch_details.iter().cloned()).collect();
        report::write_details_csv(Path::new(p), &rows)?;
        say(&paint(&format!("CSV written: {}", p), "1;36"));
    }
    match args.output {
        OutputFmt::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        OutputFmt::Text => {
            say("-----> Please find the output of the analysis in the report directory. The format is 'case-<no>-<controller>-<bundle date>-<bundle time>.log'");
            for file in &report_files {
                say("");
                say(&format!("       * {}", file.display()));
            }
            say("");
        }
    }
    say(&format!("The analysis took {:.1} seconds", started.elapsed().as_secs_f64()));
    Ok(())
}

pub(crate) fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&false) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_an_error() {
        let args = Args::parse_from(["FabDoctor", "--quiet"]);
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("--case-num or --path"));
    }

    #[test]
    fn unknown_case_is_an_error() {
        let root = std::env::temp_dir().join("fabdoctor_main_cases");
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        let args = Args::parse_from([
            "FabDoctor",
            "--quiet",
            "-c",
            "99999",
            "--support-root",
            root.to_str().unwrap(),
        ]);
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("99999"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn config_fills_unset_values_only() {
        let mut args = Args::parse_from(["FabDoctor", "--report-dir", "/tmp/explicit"]);
        let cfg: AppConfig = toml::from_str(
            "support_root = \"/srv/support\"\nreport_dir = \"/tmp/from-config\"\nprogress = true\n",
        )
        .unwrap();
        apply_config(&mut args, cfg);
        assert_eq!(args.support_root, "/srv/support");
        assert_eq!(args.report_dir, "/tmp/explicit");
        assert!(args.progress);
    }

    #[test]
    fn end_to_end_over_a_bundle_path() {
        use std::fs;
        let root = std::env::temp_dir().join("fabdoctor_main_e2e");
        let _ = fs::remove_dir_all(&root);
        let bundle_dir = root.join("bsn-support--CTRL9--2023-05-07--09-22-52Z--AAAAA");
        let ctrl = bundle_dir.join("CTRL9-1234");
        fs::create_dir_all(ctrl.join("cli")).unwrap();
        fs::write(ctrl.join(controller::SHOW_CONTROLLER_DETAILS), "1 * 10.0.0.1 active\n").unwrap();
        fs::write(ctrl.join(controller::SHOW_VERSION_DETAILS), "Ci job name: bcf-4.7\n").unwrap();
        fs::write(ctrl.join("cli/show-fabric-error"), "~ Suspended switches ~\nNone.\n").unwrap();
        let args = Args::parse_from([
            "FabDoctor",
            "--quiet",
            "-p",
            root.to_str().unwrap(),
            "--report-dir",
            root.to_str().unwrap(),
        ]);
        run(&args).unwrap();
        let report = root.join("CTRL9-2023-05-07-09-22-52Z.log");
        assert!(report.exists());
        let text = fs::read_to_string(&report).unwrap();
        assert!(text.contains("incrementing i2c errors"));
        let _ = fs::remove_dir_all(&root);
    }
}
