//! The INFO reply: literal Redis-compatible section templates with two
//! live fields, the store's key count and the process memory.

use sysinfo::{get_current_pid, ProcessRefreshKind, ProcessesToUpdate, System};

const SECTION_NAMES: [&str; 9] = [
    "server",
    "clients",
    "memory",
    "persistence",
    "stats",
    "replication",
    "cpu",
    "cluster",
    "keyspace",
];

const SERVER: &str = "redis_version:4.0.1\r\nredis_git_sha1:00000000\r\nredis_git_dirty:0\r\n\r\nredis_build_id:f37081b32886670b\r\nredis_mode:standalone\r\nos:Darwin19.6.0x86_64\r\narch_bits:64\r\nmultiplexing_api:kqueue\r\natomicvar_api:atomic-builtin\r\ngcc_version:4.2.1\r\nprocess_id:1262\r\nrun_id:e37a3f975fa07aab297fa16ef1f572da3ab874b1\r\ntcp_port:6379\r\nuptime_in_seconds:3596475\r\nuptime_in_days:41\r\nhz:10\r\nlru_clock:3060158\r\nexecutable:/usr/local/opt/redis/bin/redis-server\r\nconfig_file:/usr/local/etc/redis.conf\r\n";

const CLIENTS: &str = "connected_clients:1\r\nclient_recent_max_input_buffer:2\r\nclient_recent_max_output_buffer:0\r\nblocked_clients:0\r\n";

const PERSISTENCE: &str = "loading:0\r\nrdb_changes_since_last_save:0\r\nrdb_bgsave_in_progress:0\r\nrdb_last_save_time:1597150009\r\nrdb_last_bgsave_status:ok\r\nrdb_last_bgsave_time_sec:-1\r\nrdb_current_bgsave_time_sec:-1\r\nrdb_last_cow_size:0\r\naof_enabled:0\r\naof_rewrite_in_progress:0\r\naof_rewrite_scheduled:0\r\naof_last_rewrite_time_sec:-1\r\naof_current_rewrite_time_sec:-1\r\naof_last_bgrewrite_status:ok\r\naof_last_write_status:ok\r\naof_last_cow_size:0\r\nmodule_fork_in_progress:0\r\nmodule_fork_last_cow_size:0\r\n";

const STATS: &str = "total_connections_received:1\r\ntotal_commands_processed:1\r\ninstantaneous_ops_per_sec:0\r\ntotal_net_input_bytes:7\r\ntotal_net_output_bytes:3\r\ninstantaneous_input_kbps:0.00\r\ninstantaneous_output_kbps:0.00\r\nrejected_connections:0\r\nsync_full:0\r\nsync_partial_ok:0\r\nsync_partial_err:0\r\nexpired_keys:0\r\nexpired_stale_perc:0.00\r\nexpired_time_cap_reached_count:0\r\nevicted_keys:0\r\nkeyspace_hits:0\r\nkeyspace_misses:0\r\npubsub_channels:0\r\npubsub_patterns:0\r\nlatest_fork_usec:0\r\nmigrate_cached_sockets:0\r\nslave_expires_tracked_keys:0\r\nactive_defrag_hits:0\r\nactive_defrag_misses:0\r\nactive_defrag_key_hits:0\r\nactive_defrag_key_misses:0\r\ntracking_total_keys:0\r\ntracking_total_items:0\r\ntracking_total_prefixes:0\r\nunexpected_error_replies:0\r\n";

const REPLICATION: &str = "role:master\r\nconnected_slaves:0\r\nmaster_replid:0000000000000000000000000000000000000000\r\nmaster_replid2:0000000000000000000000000000000000000000\r\nmaster_repl_offset:0\r\nsecond_repl_offset:-1\r\nrepl_backlog_active:0\r\nrepl_backlog_size:1048576\r\nrepl_backlog_first_byte_offset:0\r\nrepl_backlog_histlen:0\r\n";

const CPU: &str = "used_cpu_sys:181.06\r\nused_cpu_user:91.95\r\nused_cpu_sys_children:0.00\r\nused_cpu_user_children:0.00\r\n";

const CLUSTER: &str = "cluster_enabled:0\r\n";

const MODULES: &str = "\r\n";

/// Expand an INFO argument list into section names.
///
/// No arguments and the aliases `all`, `default`, `everything` expand to
/// the full section list; anything else is taken as a literal section
/// name. Unknown names render as nothing.
pub fn resolve_sections(args: &[String]) -> Vec<String> {
    match args {
        [] => SECTION_NAMES.iter().map(|s| s.to_string()).collect(),
        [single] => {
            let name = single.to_ascii_lowercase();
            match name.as_str() {
                "all" | "default" | "everything" => {
                    SECTION_NAMES.iter().map(|s| s.to_string()).collect()
                }
                _ => vec![name],
            }
        }
        many => many.iter().map(|s| s.to_ascii_lowercase()).collect(),
    }
}

/// Render the requested sections into one INFO bulk-string body.
pub fn render(sections: &[String], number_of_keys: usize) -> String {
    let memory = process_memory_bytes();
    let mut out = String::new();

    for section in sections {
        let body = match section.as_str() {
            "server" => SERVER.to_string(),
            "clients" => CLIENTS.to_string(),
            "memory" => memory_section(memory),
            "persistence" => PERSISTENCE.to_string(),
            "stats" => STATS.to_string(),
            "replication" => REPLICATION.to_string(),
            "cpu" => CPU.to_string(),
            "cluster" => CLUSTER.to_string(),
            "keyspace" => format!("db0:keys={},expires=0,avg_ttl=0\r\n", number_of_keys),
            "modules" => MODULES.to_string(),
            _ => continue,
        };
        out.push_str(&format!("# {}\r\n", capitalize(section)));
        out.push_str(&body);
        out.push_str("\r\n");
    }

    out
}

fn memory_section(memory: u64) -> String {
    let memory_human = format!("{:.2}M", memory as f64 / (1024.0 * 1024.0));
    format!(
        "used_memory:{memory}\r\nused_memory_human:{memory_human}\r\nused_memory_rss:{memory}\r\nused_memory_rss_human:{memory_human}\r\nused_memory_peak:61684016\r\nused_memory_peak_human:58.83M\r\nused_memory_peak_perc:99.32%\r\nused_memory_overhead:31158374\r\nused_memory_startup:963824\r\nused_memory_dataset:30104714\r\nused_memory_dataset_perc:49.93%\r\ntotal_system_memory:17179869184\r\ntotal_system_memory_human:16.00G\r\nused_memory_lua:37888\r\nused_memory_lua_human:37.00K\r\nmaxmemory:0\r\nmaxmemory_human:0B\r\nmaxmemory_policy:noeviction\r\nmem_fragmentation_ratio:0.66\r\nmem_allocator:libc\r\nactive_defrag_running:0\r\nlazyfree_pending_objects:0\r\n",
        memory = memory,
        memory_human = memory_human,
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Resident memory of this process in bytes, 0 when unavailable.
fn process_memory_bytes() -> u64 {
    let Ok(pid) = get_current_pid() else {
        return 0;
    };
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
    );
    system.process(pid).map(|p| p.memory()).unwrap_or(0)
}
