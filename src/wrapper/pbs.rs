//! `#PBS` directive translation (§4.3), including the `-l
//! resource_list` sublanguage.

use super::{shell_split, strip_byte_suffix, Token, SCAN_LINE_CAP};

const MAGIC: &str = "#PBS";

/// Scan `body` for `#PBS` directive lines and translate each
/// recognized token into a synthetic argv token.
///
/// `-l proc=value` is append-only across the whole script (Open
/// Question (a), resolved in DESIGN.md): every occurrence accumulates
/// into one final `--constraint` token joined with `,`.
pub fn translate(body: &[u8]) -> Vec<Token> {
    let text = String::from_utf8_lossy(body);
    let mut tokens = Vec::new();
    let mut constraint_parts: Vec<String> = Vec::new();
    let mut scanned = 0usize;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with(MAGIC) {
            scanned += 1;
            if scanned > SCAN_LINE_CAP {
                break;
            }
            continue;
        }
        scanned = 0;
        let rest = trimmed[MAGIC.len()..].trim_start();
        translate_line(rest, &mut tokens, &mut constraint_parts);
    }

    if !constraint_parts.is_empty() {
        tokens.push(("constraint".to_string(), Some(constraint_parts.join(","))));
    }
    tokens
}

fn mail_type_name(letter: char) -> Option<&'static str> {
    match letter {
        'b' => Some("BEGIN"),
        'e' => Some("END"),
        'a' => Some("FAIL"),
        'n' => Some("NONE"),
        _ => None,
    }
}

fn translate_line(rest: &str, tokens: &mut Vec<Token>, constraint_parts: &mut Vec<String>) {
    let words = shell_split(rest);
    let mut i = 0;
    while i < words.len() {
        let word = &words[i];
        let Some(flag) = word.strip_prefix('-') else {
            i += 1;
            continue;
        };
        let mut flag_chars = flag.chars();
        let Some(tag) = flag_chars.next() else {
            i += 1;
            continue;
        };
        let glued: String = flag_chars.collect();
        let value = if !glued.is_empty() {
            Some(glued)
        } else {
            words.get(i + 1).cloned()
        };
        let consumed_next = glued.is_empty() && value.is_some();

        match tag {
            'a' => push(tokens, "begin", value),
            'A' => push(tokens, "account", value),
            'e' | 'o' | 'N' => push(tokens, "job-name", value),
            'm' => {
                if let Some(v) = value {
                    let names: Vec<&str> = v.chars().filter_map(mail_type_name).collect();
                    if !names.is_empty() {
                        push(tokens, "mail-type", Some(names.join(",")));
                    }
                }
            }
            'M' => push(tokens, "mail-user", value),
            'p' => push(tokens, "nice", value),
            'q' => push(tokens, "partition", value),
            'l' => {
                if let Some(v) = &value {
                    parse_l(v, tokens, constraint_parts);
                }
            }
            'W' => {
                if let Some(v) = &value {
                    if let Some(depend) = v.strip_prefix("depend=") {
                        push(tokens, "dependency", Some(depend.to_string()));
                    }
                    // `umask=` has no counterpart in this option model.
                }
            }
            // `-J`/`-t` (array), `-v` (export list) have no
            // counterpart in an interactive allocation's option model.
            _ => {}
        }

        i += if consumed_next { 2 } else { 1 };
    }
}

fn parse_l(spec: &str, tokens: &mut Vec<Token>, constraint_parts: &mut Vec<String>) {
    let mut ncpus: Option<u64> = None;
    let mut mpiprocs: Option<u64> = None;

    // `ncpus`/`mpiprocs` may turn up as their own top-level comma-separated
    // `key=value` pairs, or nested inside a PBS-Pro chunk spec
    // (`select=N:ncpus=C:mpiprocs=M[:other=x]...`), so both sites feed the
    // same local accumulators before the cpus-per-task derivation below.
    let mut record_triple_field = |key: &str, val: &str, tokens: &mut Vec<Token>| match key {
        "ncpus" => ncpus = val.parse().ok(),
        "mpiprocs" => {
            mpiprocs = val.parse().ok();
            push(tokens, "ntasks-per-node", Some(val.to_string()));
        }
        _ => {}
    };

    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, val) = match part.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim().to_string()),
            None => (part.to_ascii_lowercase(), String::new()),
        };
        match key.as_str() {
            "nodes" => {
                let first = val.split('+').next().unwrap_or(&val);
                let mut segs = first.split(':');
                if let Some(n) = segs.next() {
                    push(tokens, "nodes", Some(n.to_string()));
                }
                for seg in segs {
                    if let Some(ppn) = seg.strip_prefix("ppn=") {
                        push(tokens, "ntasks-per-node", Some(ppn.to_string()));
                    }
                }
            }
            "walltime" => push(tokens, "time", Some(val)),
            "mem" => push(tokens, "mem", Some(strip_byte_suffix(&val))),
            "mppnodes" => push(tokens, "nodes", Some(val)),
            "mppwidth" => push(tokens, "ntasks", Some(val)),
            "mppdepth" => push(tokens, "cpus-per-task", Some(val)),
            "mppnppn" => push(tokens, "ntasks-per-node", Some(val)),
            "naccelerators" => push(tokens, "gres", Some(format!("gpu:{val}"))),
            "nice" => push(tokens, "nice", Some(val)),
            "proc" => constraint_parts.push(val),
            "file" => push(tokens, "tmp", Some(strip_byte_suffix(&val))),
            // PBS-Pro chunk syntax: `select=N[:ncpus=C][:mpiprocs=M][:...]`.
            // The leading segment (before the first `:`) is the chunk
            // count; every later `subkey=subval` segment is scanned like
            // a top-level pair, so `ncpus=`/`mpiprocs=` nested here feed
            // the same accumulators as their bare top-level form.
            "select" => {
                let mut segs = val.split(':');
                if let Some(n) = segs.next() {
                    push(tokens, "nodes", Some(n.to_string()));
                }
                for seg in segs {
                    if let Some((sk, sv)) = seg.split_once('=') {
                        record_triple_field(&sk.to_ascii_lowercase(), sv.trim(), tokens);
                    }
                }
            }
            "ncpus" | "mpiprocs" => record_triple_field(&key, &val, tokens),
            // `cput`/`pcput` (per-process CPU time) have no
            // counterpart in this option model.
            _ => {}
        }
    }

    if let (Some(nc), Some(mp)) = (ncpus, mpiprocs) {
        if mp > 0 && nc > mp && nc % mp == 0 {
            push(tokens, "cpus-per-task", Some((nc / mp).to_string()));
        }
    }
}

fn push(tokens: &mut Vec<Token>, flag: &str, value: Option<String>) {
    if let Some(v) = value {
        tokens.push((flag.to_string(), Some(v)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_account_and_job_name() {
        let body = b"#PBS -A myacct\n#PBS -N myjob\n";
        let tokens = translate(body);
        assert!(tokens.contains(&("account".to_string(), Some("myacct".to_string()))));
        assert!(tokens.contains(&("job-name".to_string(), Some("myjob".to_string()))));
    }

    #[test]
    fn mail_type_letters_map_to_names() {
        let body = b"#PBS -m be\n";
        let tokens = translate(body);
        assert!(tokens.contains(&("mail-type".to_string(), Some("BEGIN,END".to_string()))));
    }

    #[test]
    fn resource_list_maps_walltime_and_mem() {
        let body = b"#PBS -l walltime=01:00:00,mem=4gb\n";
        let tokens = translate(body);
        assert!(tokens.contains(&("time".to_string(), Some("01:00:00".to_string()))));
        assert!(tokens.contains(&("mem".to_string(), Some("4g".to_string()))));
    }

    #[test]
    fn proc_values_accumulate_into_one_comma_joined_constraint() {
        let body = b"#PBS -l proc=skylake\n#PBS -l proc=avx512\n";
        let tokens = translate(body);
        assert!(tokens.contains(&("constraint".to_string(), Some("skylake,avx512".to_string()))));
    }

    #[test]
    fn pbs_pro_triple_derives_cpus_per_task() {
        let body = b"#PBS -l select=2,ncpus=8,mpiprocs=4\n";
        let tokens = translate(body);
        assert!(tokens.contains(&("cpus-per-task".to_string(), Some("2".to_string()))));
    }

    #[test]
    fn pbs_pro_chunk_syntax_with_colon_delimited_select() {
        // spec scenario 6: `select=2:ncpus=16:mpiprocs=8`.
        let body = b"#PBS -l select=2:ncpus=16:mpiprocs=8\n#PBS -l walltime=01:00:00\n";
        let tokens = translate(body);
        assert!(tokens.contains(&("nodes".to_string(), Some("2".to_string()))));
        assert!(tokens.contains(&("ntasks-per-node".to_string(), Some("8".to_string()))));
        assert!(tokens.contains(&("cpus-per-task".to_string(), Some("2".to_string()))));
        assert!(tokens.contains(&("time".to_string(), Some("01:00:00".to_string()))));
    }

    #[test]
    fn nodes_with_ppn_sets_both_fields() {
        let body = b"#PBS -l nodes=4:ppn=2\n";
        let tokens = translate(body);
        assert!(tokens.contains(&("nodes".to_string(), Some("4".to_string()))));
        assert!(tokens.contains(&("ntasks-per-node".to_string(), Some("2".to_string()))));
    }
}
