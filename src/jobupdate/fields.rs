//! The typed update request an update token stream is parsed into, and
//! the field table that drives parsing — grounded verbatim in
//! `original_source/src/scontrol/update_job.c`'s `update_job_field`
//! dispatch. Prefix lengths are taken from that file's
//! `MAX(taglen, N)` calls, not guessed.

use crate::error::SallocError;
use crate::parsers::{self, MailType};

/// Bit set on [`UpdateRequest::pn_min_memory`] by `MinMemoryCPU=`,
/// mirroring the wire protocol's `MEM_PER_CPU` flag bit.
pub const MEM_PER_CPU: u64 = 1 << 63;

/// `INFINITE` sentinel, reused from the option model's node/time
/// sentinels (§3's "NO_VAL"/"INFINITE" convention extends to this
/// client too).
pub const INFINITE: u32 = u32::MAX;

/// One parsed, typed update — every field the prefix-match table in
/// §4.7 can set. `None` means the token stream never mentioned it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    pub job_id_str: Option<String>,
    pub admin_comment: Option<String>,
    pub site_factor: Option<i64>,
    pub array_task_throttle: Option<i64>,
    pub comment: Option<String>,
    pub clusters: Option<String>,
    pub cluster_features: Option<String>,
    pub delay_boot: Option<u32>,
    pub time_limit: Option<u32>,
    pub time_min: Option<u32>,
    pub priority: Option<u32>,
    pub nice: Option<i32>,
    pub cpus_per_task: Option<u16>,
    pub cpus_per_tres: Option<String>,
    pub min_cpus: Option<u32>,
    pub max_cpus: Option<u32>,
    pub num_tasks: Option<u32>,
    pub requeue: Option<u16>,
    pub min_nodes: Option<u32>,
    pub max_nodes: Option<u32>,
    pub sockets_per_node: Option<u16>,
    pub cores_per_socket: Option<u16>,
    pub ntasks_per_node: Option<u16>,
    pub threads_per_core: Option<u16>,
    pub pn_min_cpus: Option<u16>,
    /// High bit ([`MEM_PER_CPU`]) set when the value came from
    /// `MinMemoryCPU=` rather than `MinMemoryNode=`.
    pub pn_min_memory: Option<u64>,
    pub pn_min_tmp_disk: Option<u32>,
    pub partition: Option<String>,
    pub qos: Option<String>,
    pub reservation: Option<String>,
    pub name: Option<String>,
    pub wckey: Option<String>,
    pub std_out: Option<String>,
    pub req_switch: Option<u32>,
    pub wait4switch: Option<u32>,
    pub oversubscribe: Option<bool>,
    pub contiguous: Option<bool>,
    pub core_spec: Option<u16>,
    pub thread_spec: Option<u16>,
    pub exc_node_list: Option<String>,
    pub node_list: Option<String>,
    pub features: Option<String>,
    pub gres: Option<String>,
    pub account: Option<String>,
    pub burst_buffer: Option<String>,
    pub dependency: Option<String>,
    pub licenses: Option<String>,
    pub eligible_time: Option<u64>,
    pub end_time: Option<u64>,
    pub reboot: Option<bool>,
    pub user_id: Option<u32>,
    pub deadline: Option<u64>,
    pub work_dir: Option<String>,
    pub mail_type: Option<MailType>,
    pub mail_user: Option<String>,

    /// `true` if a `Gres=help` or `Gres=list` token requested that the
    /// client print help and exit 0 instead of performing an update.
    pub gres_help_requested: bool,
}

/// `+=`/`-=` operator recorded alongside the raw value for the handful
/// of keys that give it special meaning (`TimeLimit`, `AdminComment`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Set,
    Add,
    Sub,
}

/// One `key=value` / `key+=value` / `key-=value` token, split but not
/// yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub op: Op,
    pub value: String,
}

/// Split `"TimeLimit+=01:00:00"` into its key/operator/value parts.
pub fn split_token(raw: &str) -> Result<Token, SallocError> {
    let (key_op, value) = raw
        .split_once('=')
        .ok_or_else(|| SallocError::parse("update-token", format!("missing '=' in '{raw}'")))?;
    let (key, op) = if let Some(k) = key_op.strip_suffix('+') {
        (k, Op::Add)
    } else if let Some(k) = key_op.strip_suffix('-') {
        (k, Op::Sub)
    } else {
        (key_op, Op::Set)
    };
    if key.is_empty() {
        return Err(SallocError::parse("update-token", format!("empty key in '{raw}'")));
    }
    Ok(Token {
        key: key.to_string(),
        op,
        value: value.to_string(),
    })
}

/// One entry of the prefix-match key table: the canonical key name and
/// the minimum unambiguous prefix length accepted for it (taken from
/// `update_job.c`'s `MAX(taglen, N)` calls).
struct KeyEntry {
    name: &'static str,
    min_prefix: usize,
}

/// The prefix-match table, in the order `update_job.c` checks them
/// (longer/more specific aliases first where the source does the same,
/// e.g. `JobName` before the shorter `Name`).
const KEY_TABLE: &[KeyEntry] = &[
    KeyEntry { name: "JobId", min_prefix: 3 },
    KeyEntry { name: "AdminComment", min_prefix: 6 },
    KeyEntry { name: "SiteFactor", min_prefix: 5 },
    KeyEntry { name: "ArrayTaskThrottle", min_prefix: 10 },
    KeyEntry { name: "Comment", min_prefix: 3 },
    KeyEntry { name: "Clusters", min_prefix: 8 },
    KeyEntry { name: "ClusterFeatures", min_prefix: 8 },
    KeyEntry { name: "DelayBoot", min_prefix: 5 },
    KeyEntry { name: "TimeLimit", min_prefix: 5 },
    KeyEntry { name: "TimeMin", min_prefix: 5 },
    KeyEntry { name: "Priority", min_prefix: 2 },
    KeyEntry { name: "Nice", min_prefix: 2 },
    KeyEntry { name: "CPUsPerTask", min_prefix: 9 },
    KeyEntry { name: "CpusPerTres", min_prefix: 9 },
    KeyEntry { name: "NumCPUs", min_prefix: 6 },
    KeyEntry { name: "NumTasks", min_prefix: 8 },
    KeyEntry { name: "ReqProcs", min_prefix: 8 },
    KeyEntry { name: "Requeue", min_prefix: 4 },
    KeyEntry { name: "ReqNodes", min_prefix: 8 },
    KeyEntry { name: "NumNodes", min_prefix: 8 },
    KeyEntry { name: "ReqSockets", min_prefix: 4 },
    KeyEntry { name: "ReqCores", min_prefix: 4 },
    KeyEntry { name: "TasksPerNode", min_prefix: 2 },
    KeyEntry { name: "ReqThreads", min_prefix: 4 },
    KeyEntry { name: "MinCPUsNode", min_prefix: 4 },
    KeyEntry { name: "MinMemoryNode", min_prefix: 10 },
    KeyEntry { name: "MinMemoryCPU", min_prefix: 10 },
    KeyEntry { name: "MinTmpDiskNode", min_prefix: 5 },
    KeyEntry { name: "Partition", min_prefix: 2 },
    KeyEntry { name: "QOS", min_prefix: 2 },
    KeyEntry { name: "ReservationName", min_prefix: 3 },
    KeyEntry { name: "JobName", min_prefix: 4 },
    KeyEntry { name: "Name", min_prefix: 2 },
    KeyEntry { name: "WCKey", min_prefix: 1 },
    KeyEntry { name: "StdOut", min_prefix: 6 },
    KeyEntry { name: "Switches", min_prefix: 5 },
    KeyEntry { name: "wait-for-switch", min_prefix: 5 },
    KeyEntry { name: "OverSubscribe", min_prefix: 2 },
    KeyEntry { name: "Shared", min_prefix: 2 },
    KeyEntry { name: "Contiguous", min_prefix: 3 },
    KeyEntry { name: "CoreSpec", min_prefix: 4 },
    KeyEntry { name: "MemPerTres", min_prefix: 5 },
    KeyEntry { name: "ThreadSpec", min_prefix: 4 },
    KeyEntry { name: "ExcNodeList", min_prefix: 3 },
    KeyEntry { name: "NodeList", min_prefix: 8 },
    KeyEntry { name: "ReqNodeList", min_prefix: 8 },
    KeyEntry { name: "Features", min_prefix: 1 },
    KeyEntry { name: "Gres", min_prefix: 2 },
    KeyEntry { name: "Account", min_prefix: 1 },
    KeyEntry { name: "BurstBuffer", min_prefix: 1 },
    KeyEntry { name: "Dependency", min_prefix: 1 },
    KeyEntry { name: "Licenses", min_prefix: 1 },
    KeyEntry { name: "EligibleTime", min_prefix: 2 },
    KeyEntry { name: "StartTime", min_prefix: 2 },
    KeyEntry { name: "EndTime", min_prefix: 2 },
    KeyEntry { name: "Reboot", min_prefix: 3 },
    KeyEntry { name: "UserID", min_prefix: 3 },
    KeyEntry { name: "Deadline", min_prefix: 3 },
    KeyEntry { name: "WorkDir", min_prefix: 2 },
    KeyEntry { name: "MailType", min_prefix: 5 },
    KeyEntry { name: "MailUser", min_prefix: 5 },
];

/// Resolve a possibly-abbreviated key to its canonical name, rejecting
/// both unknown keys and prefixes too short to be unambiguous for their
/// target key.
fn resolve_key(raw: &str) -> Result<&'static str, SallocError> {
    let len = raw.len();
    for entry in KEY_TABLE {
        if len >= entry.min_prefix
            && entry.name.len() >= len
            && entry.name[..len].eq_ignore_ascii_case(raw)
        {
            return Ok(entry.name);
        }
    }
    Err(SallocError::parse("update-key", format!("unrecognised or ambiguous key '{raw}'")))
}

fn parse_bool_yes_no(key: &str, v: &str) -> Result<bool, SallocError> {
    if v.eq_ignore_ascii_case("yes") {
        Ok(true)
    } else if v.eq_ignore_ascii_case("no") {
        Ok(false)
    } else {
        Err(SallocError::parse(key, format!("expected YES or NO, got '{v}'")))
    }
}

fn parse_u32(key: &str, v: &str) -> Result<u32, SallocError> {
    v.parse().map_err(|_| SallocError::parse(key, format!("not an unsigned 32-bit integer: '{v}'")))
}

fn parse_u16(key: &str, v: &str) -> Result<u16, SallocError> {
    v.parse().map_err(|_| SallocError::parse(key, format!("not an unsigned 16-bit integer: '{v}'")))
}

fn parse_i64(key: &str, v: &str) -> Result<i64, SallocError> {
    v.parse().map_err(|_| SallocError::parse(key, format!("not an integer: '{v}'")))
}

/// Apply one already-split token to an in-progress [`UpdateRequest`].
/// `current_time_limit` supplies the controller-fetched current
/// time-limit needed by `TimeLimit+=`/`TimeLimit-=` (§4.7); callers
/// that have not yet fetched it for a `+=`/`-=` token get
/// [`SallocError::Internal`].
pub fn apply_token(
    req: &mut UpdateRequest,
    token: &Token,
    current_time_limit: impl FnOnce() -> Result<u32, SallocError>,
) -> Result<(), SallocError> {
    let key = resolve_key(&token.key)?;
    let v = token.value.as_str();

    match key {
        "JobId" => {
            req.job_id_str = Some(v.to_string());
        }
        "AdminComment" => match token.op {
            Op::Sub => {
                return Err(SallocError::validation("AdminComment can not be subtracted from"));
            }
            Op::Add | Op::Set => {
                req.admin_comment = Some(v.to_string());
            }
        },
        "SiteFactor" => req.site_factor = Some(parse_i64(key, v)?),
        "ArrayTaskThrottle" => req.array_task_throttle = Some(parse_i64(key, v)?),
        "Comment" => req.comment = Some(v.to_string()),
        "Clusters" => req.clusters = Some(v.to_string()),
        "ClusterFeatures" => req.cluster_features = Some(v.to_string()),
        "DelayBoot" => req.delay_boot = Some(parsers::parse_time_minutes(v)? * 60),
        "TimeLimit" => {
            let mut minutes = parsers::parse_time_minutes(v)?;
            match token.op {
                Op::Set => {}
                Op::Add => {
                    let base = current_time_limit()?;
                    minutes = minutes.saturating_add(base);
                }
                Op::Sub => {
                    let base = current_time_limit()?;
                    if minutes > base {
                        return Err(SallocError::validation(format!(
                            "TimeLimit decrement larger than current time limit ({minutes} > {base})"
                        )));
                    }
                    minutes = base - minutes;
                }
            }
            req.time_limit = Some(minutes);
        }
        "TimeMin" => req.time_min = Some(parsers::parse_time_minutes(v)?),
        "Priority" => req.priority = Some(parse_u32(key, v)?),
        "Nice" => req.nice = Some(parse_i64(key, v)? as i32),
        "CPUsPerTask" => req.cpus_per_task = Some(parse_u16(key, v)?),
        "CpusPerTres" => req.cpus_per_tres = Some(v.to_string()),
        "NumCPUs" => {
            let range = parsers::parse_node_count(v)?;
            req.min_cpus = Some(range.min);
            if range.max != range.min {
                req.max_cpus = Some(range.max);
            }
        }
        "NumTasks" | "ReqProcs" => req.num_tasks = Some(parse_u32(key, v)?),
        "Requeue" => req.requeue = Some(parse_u16(key, v)?),
        "ReqNodes" | "NumNodes" => {
            if v == "0" {
                req.min_nodes = Some(0);
                req.max_nodes = Some(0);
            } else if v.eq_ignore_ascii_case("ALL") {
                req.min_nodes = Some(INFINITE);
            } else {
                let range = parsers::parse_node_count(v)?;
                req.min_nodes = Some(range.min);
                req.max_nodes = Some(range.max);
            }
        }
        "ReqSockets" => req.sockets_per_node = Some(parse_u16(key, v)?),
        "ReqCores" => req.cores_per_socket = Some(parse_u16(key, v)?),
        "TasksPerNode" => req.ntasks_per_node = Some(parse_u16(key, v)?),
        "ReqThreads" => req.threads_per_core = Some(parse_u16(key, v)?),
        "MinCPUsNode" => req.pn_min_cpus = Some(parse_u16(key, v)?),
        "MinMemoryNode" => req.pn_min_memory = Some(parsers::parse_mem_mb(v, false)?),
        "MinMemoryCPU" => req.pn_min_memory = Some(parsers::parse_mem_mb(v, false)? | MEM_PER_CPU),
        "MinTmpDiskNode" => req.pn_min_tmp_disk = Some(parsers::parse_mem_mb(v, false)? as u32),
        "Partition" => req.partition = Some(v.to_string()),
        "QOS" => req.qos = Some(v.to_string()),
        "ReservationName" => req.reservation = Some(v.to_string()),
        "Name" | "JobName" => req.name = Some(v.to_string()),
        "WCKey" => req.wckey = Some(v.to_string()),
        "StdOut" => req.std_out = Some(v.to_string()),
        "Switches" => {
            let (count, wait) = match v.split_once('@') {
                Some((c, w)) => (c, Some(parsers::parse_time_minutes(w)? * 60)),
                None => (v, None),
            };
            req.req_switch = Some(parse_u32(key, count)?);
            req.wait4switch = wait;
        }
        "wait-for-switch" => req.wait4switch = Some(parse_u32(key, v)?),
        "OverSubscribe" | "Shared" => req.oversubscribe = Some(parse_bool_yes_no(key, v)?),
        "Contiguous" => req.contiguous = Some(parse_bool_yes_no(key, v)?),
        "CoreSpec" => req.core_spec = Some(parse_u16(key, v)?),
        "MemPerTres" => {} // accepted, not modeled in this client's update request
        "ThreadSpec" => req.thread_spec = Some(parse_u16(key, v)?),
        "ExcNodeList" => req.exc_node_list = Some(v.to_string()),
        "NodeList" | "ReqNodeList" => req.node_list = Some(v.to_string()),
        "Features" => req.features = Some(v.to_string()),
        "Gres" => {
            if v.eq_ignore_ascii_case("help") || v.eq_ignore_ascii_case("list") {
                req.gres_help_requested = true;
            } else {
                req.gres = Some(v.to_string());
            }
        }
        "Account" => req.account = Some(v.to_string()),
        "BurstBuffer" => req.burst_buffer = Some(v.to_string()),
        "Dependency" => req.dependency = Some(v.to_string()),
        "Licenses" => req.licenses = Some(v.to_string()),
        "EligibleTime" | "StartTime" => req.eligible_time = Some(parse_epoch(key, v)?),
        "EndTime" => req.end_time = Some(parse_epoch(key, v)?),
        "Reboot" => req.reboot = Some(parse_bool_yes_no(key, v)?),
        "UserID" => req.user_id = Some(parse_u32(key, v)?),
        "Deadline" => req.deadline = Some(parse_epoch(key, v)?),
        "WorkDir" => req.work_dir = Some(v.to_string()),
        "MailType" => req.mail_type = Some(parsers::parse_mail_type(v)),
        "MailUser" => req.mail_user = Some(v.to_string()),
        _ => unreachable!("resolve_key only returns table entries"),
    }
    Ok(())
}

/// Parse an epoch-seconds or minutes-from-now time-of-day value.
/// `update_job.c` delegates to a full calendar-time parser this client
/// does not replicate; this accepts either raw epoch seconds or the
/// `now+N` minutes form the allocation option model already supports
/// via [`parsers::parse_time_minutes`].
fn parse_epoch(key: &str, v: &str) -> Result<u64, SallocError> {
    if let Some(rest) = v.strip_prefix("now+") {
        let minutes = parsers::parse_time_minutes(rest)?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        return Ok(now + minutes as u64 * 60);
    }
    v.parse().map_err(|_| SallocError::parse(key, format!("not an epoch-seconds value: '{v}'")))
}

/// Parse a whole `key=value key+=value ...` token stream into one
/// [`UpdateRequest`], fetching the current time limit on demand for
/// `TimeLimit+=`/`TimeLimit-=` tokens.
pub fn parse_tokens(
    tokens: &[String],
    current_time_limit: impl Fn(&str) -> Result<u32, SallocError>,
) -> Result<UpdateRequest, SallocError> {
    let mut req = UpdateRequest::default();
    for raw in tokens {
        let token = split_token(raw)?;
        if token.key.eq_ignore_ascii_case("TimeLimit") && token.op != Op::Set && req.job_id_str.is_none() {
            return Err(SallocError::validation("JobId must precede a TimeLimit increment or decrement"));
        }
        let job_id_str = req.job_id_str.clone();
        apply_token(&mut req, &token, || {
            let id = job_id_str
                .as_deref()
                .ok_or_else(|| SallocError::Internal("missing job id for TimeLimit +=/-=".to_string()))?;
            current_time_limit(id)
        })?;
    }
    Ok(req)
}

/// Count how many fields the parsed request actually set, mirroring
/// `update_job.c`'s `update_cnt` guard against a no-op update.
pub fn update_count(req: &UpdateRequest) -> usize {
    let mut count = 0;
    macro_rules! count_if_some {
        ($f:ident) => {
            if req.$f.is_some() {
                count += 1;
            }
        };
    }
    count_if_some!(admin_comment);
    count_if_some!(time_limit);
    count_if_some!(priority);
    count_if_some!(nice);
    count_if_some!(min_nodes);
    count_if_some!(partition);
    count_if_some!(name);
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_limit_prefix_of_length_five_is_accepted() {
        assert_eq!(resolve_key("TimeL").unwrap(), "TimeLimit");
    }

    #[test]
    fn priority_prefix_of_length_two_is_accepted() {
        assert_eq!(resolve_key("Pr").unwrap(), "Priority");
    }

    #[test]
    fn too_short_prefix_is_rejected() {
        assert!(resolve_key("T").is_err());
    }

    #[test]
    fn split_token_recognises_increment_operator() {
        let t = split_token("TimeLimit+=01:00:00").unwrap();
        assert_eq!(t.key, "TimeLimit");
        assert_eq!(t.op, Op::Add);
        assert_eq!(t.value, "01:00:00");
    }

    #[test]
    fn admin_comment_subtraction_is_rejected() {
        let mut req = UpdateRequest::default();
        let token = split_token("AdminComment-=oops").unwrap();
        let err = apply_token(&mut req, &token, || Ok(0));
        assert!(err.is_err());
    }

    #[test]
    fn time_limit_increment_adds_to_current_value() {
        let mut req = UpdateRequest::default();
        req.job_id_str = Some("42".to_string());
        let token = split_token("TimeLimit+=01:00:00").unwrap();
        apply_token(&mut req, &token, || Ok(30)).unwrap();
        assert_eq!(req.time_limit, Some(90));
    }

    #[test]
    fn time_limit_decrement_larger_than_current_is_rejected() {
        let mut req = UpdateRequest::default();
        req.job_id_str = Some("42".to_string());
        let token = split_token("TimeLimit-=02:00:00").unwrap();
        let err = apply_token(&mut req, &token, || Ok(30));
        assert!(err.is_err());
    }

    #[test]
    fn num_nodes_zero_releases_all_nodes() {
        let mut req = UpdateRequest::default();
        let token = split_token("NumNodes=0").unwrap();
        apply_token(&mut req, &token, || Ok(0)).unwrap();
        assert_eq!(req.min_nodes, Some(0));
        assert_eq!(req.max_nodes, Some(0));
    }

    #[test]
    fn num_nodes_all_sets_infinite_sentinel() {
        let mut req = UpdateRequest::default();
        let token = split_token("NumNodes=ALL").unwrap();
        apply_token(&mut req, &token, || Ok(0)).unwrap();
        assert_eq!(req.min_nodes, Some(INFINITE));
    }

    #[test]
    fn min_memory_cpu_sets_the_per_cpu_flag_bit() {
        let mut req = UpdateRequest::default();
        let token = split_token("MinMemoryCPU=4G").unwrap();
        apply_token(&mut req, &token, || Ok(0)).unwrap();
        assert_eq!(req.pn_min_memory.unwrap() & MEM_PER_CPU, MEM_PER_CPU);
    }

    #[test]
    fn gres_help_sets_the_help_flag_instead_of_a_value() {
        let mut req = UpdateRequest::default();
        let token = split_token("Gres=help").unwrap();
        apply_token(&mut req, &token, || Ok(0)).unwrap();
        assert!(req.gres_help_requested);
        assert_eq!(req.gres, None);
    }

    #[test]
    fn name_without_jobid_is_recorded_for_later_resolution() {
        let mut req = UpdateRequest::default();
        let token = split_token("Name=myjob").unwrap();
        apply_token(&mut req, &token, || Ok(0)).unwrap();
        assert_eq!(req.name, Some("myjob".to_string()));
        assert_eq!(req.job_id_str, None);
    }

    #[test]
    fn parse_tokens_rejects_increment_before_jobid() {
        let tokens = vec!["TimeLimit+=01:00:00".to_string()];
        let err = parse_tokens(&tokens, |_| Ok(0));
        assert!(err.is_err());
    }

    #[test]
    fn parse_tokens_builds_a_full_request() {
        let tokens = vec!["JobId=42".to_string(), "TimeLimit+=00:30:00".to_string(), "Priority=100".to_string()];
        let req = parse_tokens(&tokens, |_| Ok(60)).unwrap();
        assert_eq!(req.job_id_str, Some("42".to_string()));
        assert_eq!(req.time_limit, Some(90));
        assert_eq!(req.priority, Some(100));
    }
}
