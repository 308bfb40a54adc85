//! `scrun`: the OCI container runtime front-end (C6, §4.6).

use std::path::PathBuf;

use clap::Parser;

use slurm_alloc_client::cli::scrun_args::{ScrunArgs, ScrunCommand};
use slurm_alloc_client::container::runtime_root::{select_runtime_root, OsRootProbe};
use slurm_alloc_client::container::transport::RealAnchorTransport;
use slurm_alloc_client::container::{self, AssumeJobDoneSignaler, DEFAULT_KILL_SIGNAL};
use slurm_alloc_client::error::SallocError;
use slurm_alloc_client::optmodel::defaults::{OsIdentity, ProcessIdentity};
use slurm_alloc_client::parsers::signal::sig_name_to_num;

fn main() {
    let args = ScrunArgs::parse();
    init_logging(&args);

    let exit_code = match run(&args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e.user_friendly_message("scrun"));
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

/// §4.6: log format defaults to JSON with RFC3339 timestamps when
/// `--log` is set without `--log-format`; verbosity is the max of the
/// CLI `-v` count and the `SCRUN_*_DEBUG` env vars.
fn init_logging(args: &ScrunArgs) {
    let env_debug = ["SCRUN_DEBUG", "SCRUN_STDERR_DEBUG", "SCRUN_SYSLOG_DEBUG", "SCRUN_FILE_DEBUG"]
        .iter()
        .filter_map(|k| std::env::var(k).ok().and_then(|v| v.parse::<u8>().ok()))
        .max()
        .unwrap_or(0);
    let verbosity = args.verbose.max(env_debug).max(if args.debug { 1 } else { 0 });

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let json = args.log.is_some() && args.log_format.is_none() || args.log_format.as_deref() == Some("json");

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if json {
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{:?}}}",
                humantime_rfc3339_now(),
                record.level(),
                record.args().to_string()
            )
        });
    }
    builder.init();
}

/// Format the current wall-clock time as an RFC3339 UTC timestamp
/// (`YYYY-MM-DDTHH:MM:SSZ`), via Howard Hinnant's `civil_from_days`
/// algorithm (the inverse of the one `parsers::time::parse_begin_time`
/// uses to go the other way).
fn humantime_rfc3339_now() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs() as i64;
    let days = secs.div_euclid(86_400);
    let secs_of_day = secs.rem_euclid(86_400);
    let (y, m, d) = civil_from_days(days);
    let (h, mi, s) = (secs_of_day / 3_600, (secs_of_day / 60) % 60, secs_of_day % 60);
    format!("{y:04}-{m:02}-{d:02}T{h:02}:{mi:02}:{s:02}Z")
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

fn run(args: &ScrunArgs) -> Result<(), SallocError> {
    if let Some(mgr) = &args.cgroup_manager {
        log::warn!("--cgroup-manager={mgr} is accepted and ignored");
    }
    if args.rootless.is_some() {
        log::warn!("--rootless is accepted and ignored");
    }
    if args.systemd_cgroup {
        log::warn!("--systemd-cgroup is accepted and ignored");
    }

    if matches!(args.command, ScrunCommand::Version) {
        println!("{}", container::version_line("1.0.2"));
        return Ok(());
    }

    let xdg = std::env::var("XDG_RUNTIME_DIR").ok();
    let tmpdir = std::env::var("TMPDIR").ok();
    let runtime_root = select_runtime_root(
        args.root.as_deref(),
        xdg.as_deref(),
        tmpdir.as_deref().or(Some("/tmp")),
        &OsRootProbe,
    )?;

    let user = OsIdentity.user_name()?;
    let transport = RealAnchorTransport;
    let signaler = AssumeJobDoneSignaler;

    match &args.command {
        ScrunCommand::Create { bundle, id, .. } => {
            container::create(&runtime_root, id, &PathBuf::from(bundle))?;
        }
        ScrunCommand::Start { id } => {
            container::start(&runtime_root, id, &user, &transport)?;
        }
        ScrunCommand::State { id } => {
            let state = container::state_json(&runtime_root, id, &user, &transport)?;
            println!("{}", serde_json::to_string(&state)?);
        }
        ScrunCommand::Kill { id, signal } => {
            let sig = match signal {
                Some(s) => sig_name_to_num(s)
                    .ok_or_else(|| SallocError::parse("signal", format!("unknown signal: '{s}'")))?,
                None => DEFAULT_KILL_SIGNAL,
            };
            container::kill(&runtime_root, id, &user, sig, &transport, &signaler)?;
        }
        ScrunCommand::Delete { force, id } => {
            container::delete(&runtime_root, id, &user, *force, &transport, &signaler)?;
        }
        ScrunCommand::Version => unreachable!("handled above"),
    }

    Ok(())
}
