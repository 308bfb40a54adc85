//! Pass 3 of the three-pass fill (§4.2): command-line overlay, and the
//! heterogeneous-job splitter that turns one invocation into several
//! descriptors around bare `:` separators.

use crate::cli::salloc_args::SallocArgs;
use crate::error::SallocError;
use crate::optmodel::job_desc::{BellPolicy, GetUserEnv, Sharing};
use crate::optmodel::partial::PartialJobDesc;
use crate::parsers;
use log::{info, warn};

/// Split a full `argv` (program name at index 0) into one segment per
/// heterogeneous-job component around bare `:` tokens.
///
/// Each returned segment is itself a valid `argv` — the program name is
/// repeated at the front of every segment after the first — so each can
/// be fed straight to [`SallocArgs::try_parse_from`]. A lone trailing or
/// leading `:`, or two consecutive `:` tokens, yields an empty
/// descriptor segment (just the program name); `clap` will then report
/// whatever that segment's own validation requires.
pub fn split_hetjob_argv(argv: &[String]) -> Vec<Vec<String>> {
    let Some(prog) = argv.first() else {
        return vec![Vec::new()];
    };
    let mut segments = vec![vec![prog.clone()]];
    for tok in &argv[1..] {
        if tok == ":" {
            segments.push(vec![prog.clone()]);
        } else {
            segments.last_mut().unwrap().push(tok.clone());
        }
    }
    segments
}

/// Apply one `argv` segment's parsed [`SallocArgs`] onto a fresh overlay.
pub fn apply_argv(args: &SallocArgs) -> Result<PartialJobDesc, SallocError> {
    let mut p = PartialJobDesc::default();

    if let Some(v) = &args.nodes {
        let nc = parsers::parse_node_count(v)?;
        p.min_nodes = Some(nc.min);
        p.max_nodes = Some(nc.max);
        p.nodes_set = Some(true);
    }
    if let Some(n) = args.ntasks {
        p.ntasks = Some(n);
        p.ntasks_set = Some(true);
    }
    if let Some(n) = args.cpus_per_task {
        p.cpus_per_task = Some(n);
    }

    if let Some(v) = &args.extra_node_info {
        let rt = parsers::parse_resource_tuple(v)?;
        p.sockets_per_node = rt.sockets.map(|nc| nc.max);
        p.cores_per_socket = rt.cores.map(|nc| nc.max);
        p.threads_per_core = rt.threads.map(|nc| nc.max);
    }
    if let Some(n) = args.sockets_per_node {
        p.sockets_per_node = Some(n);
    }
    if let Some(n) = args.cores_per_socket {
        p.cores_per_socket = Some(n);
    }
    if let Some(n) = args.threads_per_core {
        p.threads_per_core = Some(n);
    }
    if let Some(n) = args.ntasks_per_node {
        p.ntasks_per_node = Some(n);
    }
    if let Some(n) = args.ntasks_per_socket {
        p.ntasks_per_socket = Some(n);
    }
    if let Some(n) = args.ntasks_per_core {
        p.ntasks_per_core = Some(n);
    }
    if let Some(n) = args.core_spec {
        p.core_spec = Some(n);
    }

    if let Some(v) = &args.mem {
        p.mem_per_node = Some(parsers::parse_mem_mb(v, false)?);
    }
    if let Some(v) = &args.mem_per_cpu {
        p.mem_per_cpu = Some(parsers::parse_mem_mb(v, false)?);
    }
    if let Some(v) = &args.tmp {
        p.tmp_disk = Some(parsers::parse_mem_mb(v, false)?);
    }

    if let Some(v) = &args.partition {
        p.partition = Some(v.clone());
    }
    if let Some(v) = &args.qos {
        p.qos = Some(v.clone());
    }
    if let Some(v) = &args.account {
        p.account = Some(v.clone());
    }
    if let Some(v) = &args.reservation {
        p.reservation = Some(v.clone());
    }
    if let Some(v) = &args.wckey {
        p.wckey = Some(v.clone());
    }
    if let Some(v) = &args.dependency {
        p.dependency = Some(v.clone());
    }
    if let Some(n) = args.priority {
        p.priority = Some(n);
    }
    if let Some(n) = args.nice {
        p.nice = Some(n);
    }

    if let Some(v) = &args.time {
        p.time_limit = Some(parsers::parse_time_minutes(v)?);
    }
    if let Some(v) = &args.time_min {
        p.time_min = Some(parsers::parse_time_minutes(v)?);
    }
    if let Some(n) = args.immediate {
        p.immediate_seconds = Some(n);
    }

    if args.hold {
        p.hold = Some(true);
    }
    if args.reboot {
        p.reboot = Some(true);
    }
    if args.contiguous {
        p.contiguous = Some(true);
    }
    if args.no_rotate {
        p.no_rotate = Some(true);
    }
    if args.quiet {
        p.quiet = Some(true);
    }
    if args.verbose > 0 {
        p.verbose = Some(args.verbose);
    }
    if args.no_shell {
        p.no_shell = Some(true);
    }

    // Exclusive/share/overcommit all resolve onto the same tri-state;
    // exclusive wins when more than one is given on the same segment.
    if args.exclusive {
        p.sharing = Some(Sharing::Exclusive);
    } else if args.share || args.overcommit {
        p.sharing = Some(Sharing::Shared);
    }

    if args.no_bell {
        p.bell = Some(BellPolicy::Never);
    } else if args.bell {
        p.bell = Some(BellPolicy::Always);
    }

    if let Some(v) = &args.geometry {
        p.geometry = Some(parsers::parse_geometry(v)?);
    }
    if let Some(v) = &args.conn_type {
        p.conn_type = Some(v.split(',').map(str::to_string).collect());
    }
    if let Some(v) = &args.distribution {
        p.distribution = Some(parsers::parse_distribution(v)?);
    }

    if let Some(v) = &args.nodefile {
        p.node_list = Some(v.clone());
    }
    if let Some(v) = &args.nodelist {
        p.node_list = Some(v.clone());
    }
    if let Some(v) = &args.exclude {
        p.exclude_list = Some(v.clone());
    }
    if let Some(v) = &args.constraint {
        p.constraint = Some(v.clone());
    }
    if let Some(v) = &args.licenses {
        p.licenses = Some(v.clone());
    }
    if let Some(v) = &args.network {
        p.network = Some(v.clone());
    }
    if let Some(v) = &args.gres {
        p.gres = Some(v.clone());
    }

    if let Some(v) = &args.switches {
        let (count_part, wait) = match v.split_once('@') {
            Some((c, w)) => {
                let secs = parsers::parse_time_minutes(w).map(|m| m.saturating_mul(60))?;
                (c, Some(secs))
            }
            None => (v.as_str(), None),
        };
        p.switches = Some(count_part.parse().map_err(|_| {
            SallocError::parse("switches", format!("not a number: '{count_part}'"))
        })?);
        p.switches_wait = wait;
    }

    if let Some(v) = &args.job_name {
        p.job_name = Some(v.clone());
    }
    if let Some(v) = &args.chdir {
        p.chdir = Some(v.clone());
    }

    if let Some(v) = &args.mail_type {
        p.mail_type = Some(parsers::parse_mail_type(v));
    }
    if let Some(v) = &args.mail_user {
        p.mail_user = Some(v.clone());
    }

    // -K/--kill-command and --signal both feed the same warning/kill
    // signal slot, matching the environment overlay's treatment of
    // SALLOC_SIGNAL/SALLOC_KILL_CMD as interchangeable.
    if let Some(v) = args.signal.as_deref().or(args.kill_command.as_deref()) {
        let spec = parsers::parse_signal_spec(v)?;
        p.kill_command_signal = Some(spec.signal);
    }

    if let Some(n) = args.wait_all_nodes {
        p.wait_all_nodes = Some(n != 0);
    }

    if let Some(uid) = args.uid {
        p.euid = Some(uid);
    }
    if let Some(gid) = args.gid {
        p.egid = Some(gid);
    }

    if let Some(v) = &args.get_user_env {
        p.get_user_env = Some(parse_get_user_env(v)?);
    }

    if !args.command.is_empty() {
        p.command = Some(args.command.clone());
    }

    if args.no_kill {
        p.no_kill = Some(true);
    }
    if let Some(v) = &args.comment {
        p.comment = Some(v.clone());
    }
    if let Some(v) = &args.profile {
        p.profile = Some(v.clone());
    }
    if let Some(v) = &args.mem_bind {
        p.mem_bind = Some(v.clone());
    }
    if let Some(v) = &args.hint {
        match v.as_str() {
            "compute_bound" => p.threads_per_core = Some(1),
            "memory_bound" => p.ntasks_per_core = Some(1),
            other => warn!("ignoring unrecognised --hint={other}"),
        }
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if let Some(v) = &args.begin {
        p.begin_time = Some(parsers::time::parse_begin_time(v, now)?);
    }
    if let Some(v) = &args.deadline {
        p.deadline = Some(parsers::time::parse_begin_time(v, now)?);
    }
    if args.jobid.is_some() {
        info!("--jobid is notice-only, not applied to a new request");
    }

    Ok(p)
}

/// Parse `--get-user-env`'s `[N][s][l]` suffix grammar. A bare flag
/// (empty string) means "enabled, no timeout, not a login shell".
fn parse_get_user_env(v: &str) -> Result<GetUserEnv, SallocError> {
    if v.is_empty() {
        return Ok(GetUserEnv::Enabled {
            timeout: None,
            login_shell: false,
        });
    }
    let digits_end = v.find(|c: char| !c.is_ascii_digit()).unwrap_or(v.len());
    let (digits, suffix) = v.split_at(digits_end);
    let timeout = if digits.is_empty() {
        None
    } else {
        Some(
            digits
                .parse()
                .map_err(|_| SallocError::parse("get-user-env", format!("bad timeout: '{digits}'")))?,
        )
    };
    let login_shell = suffix.contains('l');
    if suffix.chars().any(|c| c != 's' && c != 'l') {
        return Err(SallocError::parse(
            "get-user-env",
            format!("unknown suffix: '{suffix}'"),
        ));
    }
    Ok(GetUserEnv::Enabled {
        timeout,
        login_shell,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> SallocArgs {
        let mut full = vec!["salloc"];
        full.extend_from_slice(args);
        SallocArgs::parse_from(full)
    }

    #[test]
    fn splits_on_bare_colon() {
        let argv: Vec<String> = ["salloc", "-N2", ":", "-N4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let segs = split_hetjob_argv(&argv);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], vec!["salloc", "-N2"]);
        assert_eq!(segs[1], vec!["salloc", "-N4"]);
    }

    #[test]
    fn no_colon_is_a_single_segment() {
        let argv: Vec<String> = ["salloc", "-N2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(split_hetjob_argv(&argv).len(), 1);
    }

    #[test]
    fn nodes_and_ntasks_set_flags() {
        let args = parse(&["-N2-4", "-n8"]);
        let p = apply_argv(&args).unwrap();
        assert_eq!(p.min_nodes, Some(2));
        assert_eq!(p.max_nodes, Some(4));
        assert_eq!(p.nodes_set, Some(true));
        assert_eq!(p.ntasks, Some(8));
        assert_eq!(p.ntasks_set, Some(true));
    }

    #[test]
    fn exclusive_wins_over_share() {
        let args = parse(&["--exclusive", "-s"]);
        let p = apply_argv(&args).unwrap();
        assert_eq!(p.sharing, Some(Sharing::Exclusive));
    }

    #[test]
    fn switches_with_wait() {
        let args = parse(&["--switches=4@00:30"]);
        let p = apply_argv(&args).unwrap();
        assert_eq!(p.switches, Some(4));
        assert_eq!(p.switches_wait, Some(30 * 60));
    }

    #[test]
    fn get_user_env_bare_flag() {
        let args = parse(&["--get-user-env"]);
        let p = apply_argv(&args).unwrap();
        assert_eq!(
            p.get_user_env,
            Some(GetUserEnv::Enabled {
                timeout: None,
                login_shell: false
            })
        );
    }

    #[test]
    fn get_user_env_with_timeout_and_login_shell() {
        let args = parse(&["--get-user-env=30l"]);
        let p = apply_argv(&args).unwrap();
        assert_eq!(
            p.get_user_env,
            Some(GetUserEnv::Enabled {
                timeout: Some(30),
                login_shell: true
            })
        );
    }

    #[test]
    fn kill_command_and_signal_share_the_slot() {
        let args = parse(&["--signal=USR1@30"]);
        let p = apply_argv(&args).unwrap();
        assert_eq!(p.kill_command_signal, parsers::sig_name_to_num("USR1"));
    }

    #[test]
    fn command_is_captured() {
        let args = parse(&["/bin/echo", "hi"]);
        let p = apply_argv(&args).unwrap();
        assert_eq!(p.command, Some(vec!["/bin/echo".to_string(), "hi".to_string()]));
    }
}
