//! Partial job-descriptor structure and merge logic — the `Option<T>`
//! mirror of [`JobDesc`] that each overlay pass (defaults, environment,
//! argv) produces, generalizing the teacher's `PartialConfig::merge`
//! pattern to the three-pass fill of §4.2.

use crate::error::SallocError;
use crate::optmodel::job_desc::{BellPolicy, GetUserEnv, JobDesc, Sharing};
use crate::parsers::{Distribution, MailType};

/// `Option<T>` mirror of [`JobDesc`]. A `None` field means "this overlay
/// pass did not touch the field"; merging takes the later pass's value
/// whenever it is `Some`.
#[derive(Debug, Clone, Default)]
pub struct PartialJobDesc {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub euid: Option<u32>,
    pub egid: Option<u32>,
    pub user_name: Option<String>,
    pub submit_host: Option<String>,
    pub submit_dir: Option<String>,

    pub ntasks: Option<u32>,
    pub ntasks_set: Option<bool>,
    pub min_nodes: Option<u32>,
    pub max_nodes: Option<u32>,
    pub nodes_set: Option<bool>,
    pub cpus_per_task: Option<u32>,
    pub ntasks_per_node: Option<u32>,
    pub ntasks_per_socket: Option<u32>,
    pub ntasks_per_core: Option<u32>,
    pub sockets_per_node: Option<u32>,
    pub cores_per_socket: Option<u32>,
    pub threads_per_core: Option<u32>,
    pub min_cpus_per_node: Option<u32>,

    pub mem_per_node: Option<u64>,
    pub mem_per_cpu: Option<u64>,
    pub tmp_disk: Option<u64>,

    pub partition: Option<String>,
    pub qos: Option<String>,
    pub account: Option<String>,
    pub reservation: Option<String>,
    pub wckey: Option<String>,
    pub dependency: Option<String>,
    pub priority: Option<u32>,
    pub nice: Option<i32>,
    pub begin_time: Option<u64>,
    pub deadline: Option<u64>,
    pub time_limit: Option<u32>,
    pub time_min: Option<u32>,
    pub immediate_seconds: Option<u32>,
    pub hold: Option<bool>,
    pub requeue: Option<bool>,
    pub sharing: Option<Sharing>,

    pub geometry: Option<Vec<u32>>,
    pub conn_type: Option<Vec<String>>,
    pub no_rotate: Option<bool>,
    pub reboot: Option<bool>,

    pub node_list: Option<String>,
    pub exclude_list: Option<String>,
    pub contiguous: Option<bool>,
    pub constraint: Option<String>,
    pub licenses: Option<String>,
    pub core_spec: Option<u32>,
    pub core_spec_is_threads: Option<bool>,
    pub network: Option<String>,
    pub gres: Option<String>,
    pub switches: Option<u32>,
    pub switches_wait: Option<u32>,

    pub distribution: Option<Distribution>,

    pub job_name: Option<String>,
    pub chdir: Option<String>,
    pub export_env: Option<Vec<String>>,
    pub spank_env: Option<Vec<(String, String)>>,
    pub get_user_env: Option<GetUserEnv>,

    pub bell: Option<BellPolicy>,
    pub kill_command_signal: Option<i32>,
    pub no_shell: Option<bool>,
    pub wait_all_nodes: Option<bool>,
    pub mail_type: Option<MailType>,
    pub mail_user: Option<String>,
    pub quiet: Option<bool>,
    pub verbose: Option<u8>,
    pub mem_bind: Option<String>,
    pub profile: Option<String>,
    pub comment: Option<String>,
    pub no_kill: Option<bool>,

    pub command: Option<Vec<String>>,
}

macro_rules! overlay {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {
        $(
            if $over.$field.is_some() {
                $base.$field = $over.$field;
            }
        )+
    };
}

impl PartialJobDesc {
    /// Merge `over` onto `self` in place: every `Some` field in `over`
    /// replaces the corresponding field in `self`.
    pub fn merge(&mut self, over: PartialJobDesc) {
        overlay!(
            self, over, uid, gid, euid, egid, user_name, submit_host, submit_dir, ntasks,
            ntasks_set, min_nodes, max_nodes, nodes_set, cpus_per_task, ntasks_per_node,
            ntasks_per_socket, ntasks_per_core, sockets_per_node, cores_per_socket,
            threads_per_core, min_cpus_per_node, mem_per_node, mem_per_cpu, tmp_disk, partition,
            qos, account, reservation, wckey, dependency, priority, nice, begin_time, deadline,
            time_limit, time_min, immediate_seconds, hold, requeue, sharing, geometry, conn_type,
            no_rotate, reboot, node_list, exclude_list, contiguous, constraint, licenses,
            core_spec, core_spec_is_threads, network, gres, switches, switches_wait, distribution,
            job_name, chdir, export_env, spank_env, get_user_env, bell, kill_command_signal,
            no_shell, wait_all_nodes, mail_type, mail_user, quiet, verbose, command, mem_bind,
            profile, comment, no_kill,
        );
    }

    /// Freeze a fully-merged partial descriptor into a [`JobDesc`],
    /// substituting sentinels for any field that is still `None` after
    /// all three overlay passes ran (defaults should have supplied
    /// every non-Option field, so a `None` here indicates a defaults
    /// bug rather than a user omission).
    pub fn freeze(self) -> Result<JobDesc, SallocError> {
        macro_rules! req {
            ($f:ident) => {
                self.$f
                    .ok_or_else(|| SallocError::Internal(format!("missing default for {}", stringify!($f))))?
            };
        }
        Ok(JobDesc {
            uid: req!(uid),
            gid: req!(gid),
            euid: self.euid,
            egid: self.egid,
            user_name: req!(user_name),
            submit_host: req!(submit_host),
            submit_dir: req!(submit_dir),
            ntasks: req!(ntasks),
            ntasks_set: self.ntasks_set.unwrap_or(false),
            min_nodes: req!(min_nodes),
            max_nodes: req!(max_nodes),
            nodes_set: self.nodes_set.unwrap_or(false),
            cpus_per_task: req!(cpus_per_task),
            ntasks_per_node: self.ntasks_per_node.unwrap_or(0),
            ntasks_per_socket: self.ntasks_per_socket.unwrap_or(0),
            ntasks_per_core: self.ntasks_per_core.unwrap_or(0),
            sockets_per_node: self.sockets_per_node.unwrap_or(0),
            cores_per_socket: self.cores_per_socket.unwrap_or(0),
            threads_per_core: self.threads_per_core.unwrap_or(0),
            min_cpus_per_node: self.min_cpus_per_node.unwrap_or(0),
            mem_per_node: self.mem_per_node.unwrap_or(0),
            mem_per_cpu: self.mem_per_cpu.unwrap_or(0),
            tmp_disk: self.tmp_disk.unwrap_or(0),
            partition: self.partition,
            qos: self.qos,
            account: self.account,
            reservation: self.reservation,
            wckey: self.wckey,
            dependency: self.dependency,
            priority: self.priority,
            nice: self.nice.unwrap_or(0),
            begin_time: self.begin_time,
            deadline: self.deadline,
            time_limit: req!(time_limit),
            time_min: req!(time_min),
            immediate_seconds: self.immediate_seconds,
            hold: self.hold.unwrap_or(false),
            requeue: self.requeue.unwrap_or(false),
            sharing: self.sharing.unwrap_or_default(),
            geometry: self.geometry.unwrap_or_default(),
            conn_type: self.conn_type.unwrap_or_default(),
            no_rotate: self.no_rotate.unwrap_or(false),
            reboot: self.reboot.unwrap_or(false),
            node_list: self.node_list,
            exclude_list: self.exclude_list,
            contiguous: self.contiguous.unwrap_or(false),
            constraint: self.constraint,
            licenses: self.licenses,
            core_spec: self.core_spec,
            core_spec_is_threads: self.core_spec_is_threads.unwrap_or(false),
            network: self.network,
            gres: self.gres,
            switches: self.switches,
            switches_wait: self.switches_wait,
            distribution: self.distribution.unwrap_or_default(),
            job_name: self.job_name,
            chdir: self.chdir,
            export_env: self.export_env.unwrap_or_default(),
            spank_env: self.spank_env.unwrap_or_default(),
            get_user_env: self.get_user_env.unwrap_or_default(),
            bell: self.bell.unwrap_or_default(),
            kill_command_signal: req!(kill_command_signal),
            no_shell: self.no_shell.unwrap_or(false),
            wait_all_nodes: self.wait_all_nodes,
            mail_type: self.mail_type.unwrap_or_default(),
            mail_user: self.mail_user,
            quiet: self.quiet.unwrap_or(false),
            verbose: self.verbose.unwrap_or(0),
            mem_bind: self.mem_bind,
            profile: self.profile,
            comment: self.comment,
            no_kill: self.no_kill.unwrap_or(false),
            command: self.command.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_only_some_fields() {
        let mut base = PartialJobDesc {
            ntasks: Some(1),
            job_name: Some("base".into()),
            ..Default::default()
        };
        let over = PartialJobDesc {
            job_name: Some("over".into()),
            ..Default::default()
        };
        base.merge(over);
        assert_eq!(base.ntasks, Some(1));
        assert_eq!(base.job_name, Some("over".into()));
    }
}
