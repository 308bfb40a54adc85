//! `#BSUB` directive translation (§4.3).

use super::{shell_split, Token, SCAN_LINE_CAP};

const MAGIC: &str = "#BSUB";

/// Scan `body` for `#BSUB` directive lines and translate each
/// recognized token 1:1 into a synthetic argv token.
pub fn translate(body: &[u8]) -> Vec<Token> {
    let text = String::from_utf8_lossy(body);
    let mut tokens = Vec::new();
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
        translate_line(rest, &mut tokens);
    }
    tokens
}

fn translate_line(rest: &str, tokens: &mut Vec<Token>) {
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
        // `-x` takes no argument; every other recognized flag does.
        if tag == 'x' {
            tokens.push(("exclusive".to_string(), None));
            i += 1;
            continue;
        }

        // `-JVALUE` (glued) or `-J VALUE` (separate), matching the
        // source's `bsub` argument style.
        let glued: String = flag_chars.collect();
        let value = if !glued.is_empty() {
            Some(glued)
        } else {
            words.get(i + 1).cloned()
        };
        let consumed_next = glued.is_empty() && value.is_some();

        match tag {
            'c' => push(tokens, "chdir", value),
            'J' => push(tokens, "job-name", value),
            'm' => {
                if let Some(v) = value {
                    push(tokens, "nodelist", Some(v.replace(' ', ",")));
                }
            }
            'M' => push(tokens, "mem-per-cpu", value),
            'n' => {
                if let Some(v) = value {
                    let max = v.rsplit(',').next().unwrap_or(&v).trim().to_string();
                    push(tokens, "ntasks", Some(max));
                }
            }
            'q' => push(tokens, "partition", value),
            'W' => push(tokens, "time", value),
            // `-e`/`-o` (stderr/stdout path) have no counterpart in an
            // interactive allocation's option model; ignored.
            _ => {}
        }

        i += if consumed_next { 2 } else { 1 };
    }
}

fn push(tokens: &mut Vec<Token>, flag: &str, value: Option<String>) {
    if let Some(v) = value {
        tokens.push((flag.to_string(), Some(v)));
    }
}
