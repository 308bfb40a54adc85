//! Wrapper translator (C3, §4.3): turns `#BSUB`/`#PBS` directive lines
//! embedded in a script body into synthetic argv tokens that flow
//! through the *same* setters [`crate::optmodel::argv::apply_argv`]
//! uses, so validation stays uniform across every entry point (§9).

pub mod bsub;
pub mod pbs;

/// Hard cap from §4.3: scanning stops after this many consecutive
/// non-comment (non-matching) lines.
pub const SCAN_LINE_CAP: usize = 100;

/// One translated option: a long-flag name (without leading dashes) and
/// an optional value.
pub type Token = (String, Option<String>);

/// Render translated tokens as `--flag` / `--flag=value` argv strings,
/// ready to hand to [`clap::Parser::parse_from`] alongside the rest of
/// argv.
pub fn tokens_to_argv(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .map(|(flag, value)| match value {
            Some(v) => format!("--{flag}={v}"),
            None => format!("--{flag}"),
        })
        .collect()
}

/// Shell-like quote-aware split of one directive's remaining text into
/// whitespace-separated words, honoring single and double quotes.
pub(crate) fn shell_split(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut has_content = false;

    for c in s.chars() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                has_content = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                has_content = true;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if has_content {
                    words.push(std::mem::take(&mut current));
                    has_content = false;
                }
            }
            c => {
                current.push(c);
                has_content = true;
            }
        }
    }
    if has_content {
        words.push(current);
    }
    words
}

/// §4.3's suffix stripping: `B` on a byte-count unit behaves like no
/// `B` at all (`GB`/`MB` == `G`/`M`).
pub(crate) fn strip_byte_suffix(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let last = bytes[bytes.len() - 1];
        let unit = bytes[bytes.len() - 2];
        if (last == b'b' || last == b'B') && unit.is_ascii_alphabetic() {
            return value[..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_split_honors_double_quotes() {
        let words = shell_split(r#"-J "my job" -q normal"#);
        assert_eq!(words, vec!["-J", "my job", "-q", "normal"]);
    }

    #[test]
    fn tokens_render_as_long_flags() {
        let argv = tokens_to_argv(&[("job-name".to_string(), Some("x".to_string())), ("exclusive".to_string(), None)]);
        assert_eq!(argv, vec!["--job-name=x".to_string(), "--exclusive".to_string()]);
    }

    #[test]
    fn strip_byte_suffix_drops_trailing_b() {
        assert_eq!(strip_byte_suffix("4gb"), "4g");
        assert_eq!(strip_byte_suffix("4GB"), "4G");
        assert_eq!(strip_byte_suffix("4g"), "4g");
    }
}
