//! Signal-name/number parsing, including the `B:name@seconds` warn-signal
//! grammar used by `--signal`/`--kill-command`.
//!
//! Grounded in `original_source/src/common/proc_args.c`'s `sig_name2num`
//! and `get_signal_opts`: numeric signals are accepted via a strict
//! decimal parse (trailing garbage rejected), name lookup is
//! case-insensitive with an optional leading `SIG`, and `@seconds`
//! defaults to 60 when absent.

use crate::error::SallocError;

/// One entry of the recognised signal-name table.
const SIGNAL_NAMES: &[(&str, i32)] = &[
    ("HUP", 1),
    ("INT", 2),
    ("QUIT", 3),
    ("ABRT", 6),
    ("KILL", 9),
    ("USR1", 10),
    ("USR2", 12),
    ("PIPE", 13),
    ("ALRM", 14),
    ("TERM", 15),
    ("CHLD", 17),
    ("CONT", 18),
    ("STOP", 19),
    ("TSTP", 20),
    ("TTIN", 21),
    ("TTOU", 22),
    ("URG", 23),
];

/// Upper (exclusive) bound for a numeric signal argument, mirroring the
/// platform's `SIGRTMAX`. This is a generous fixed value rather than a
/// libc query because the value only gates parser acceptance, not actual
/// signal delivery.
pub const SIGRTMAX: i32 = 64;

/// Convert a signal name (optionally `SIG`-prefixed, case-insensitive)
/// or decimal string to its numeric value. Returns `None` if the input
/// matches neither a known name nor a plain number in `[1, SIGRTMAX)`.
pub fn sig_name_to_num(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i32>() {
        return if (1..SIGRTMAX).contains(&n) {
            Some(n)
        } else {
            None
        };
    }
    let name = trimmed
        .strip_prefix("SIG")
        .or_else(|| trimmed.strip_prefix("sig"))
        .unwrap_or(trimmed);
    SIGNAL_NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| *v)
}

/// A parsed `[B:]signal[@seconds]` warn-signal specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSpec {
    /// Signal number.
    pub signal: i32,
    /// Lead time in seconds before the signal is sent; defaults to 60.
    pub seconds: u32,
    /// Whether the `B:` (batch) flag was present.
    pub batch: bool,
}

/// Parse the `[B:]signal[@seconds]` grammar used by `--signal`.
pub fn parse_signal_spec(s: &str) -> Result<SignalSpec, SallocError> {
    let (batch, rest) = match s.strip_prefix("B:").or_else(|| s.strip_prefix("b:")) {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (name_part, seconds) = match rest.split_once('@') {
        Some((name, secs)) => {
            let secs: u32 = secs
                .parse()
                .map_err(|_| SallocError::parse("signal", format!("bad lead time: '{secs}'")))?;
            (name, secs)
        }
        None => (rest, 60),
    };

    let signal = sig_name_to_num(name_part)
        .ok_or_else(|| SallocError::parse("signal", format!("unknown signal: '{name_part}'")))?;

    Ok(SignalSpec {
        signal,
        seconds,
        batch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_law_name_with_and_without_sig_prefix() {
        for (name, _) in SIGNAL_NAMES {
            let bare = sig_name_to_num(name);
            let prefixed = sig_name_to_num(&format!("SIG{name}"));
            assert_eq!(bare, prefixed);
            assert!(bare.is_some());
        }
    }

    #[test]
    fn signal_law_numeric_round_trip() {
        for n in 1..SIGRTMAX {
            assert_eq!(sig_name_to_num(&n.to_string()), Some(n));
        }
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(sig_name_to_num("term"), sig_name_to_num("TERM"));
        assert_eq!(sig_name_to_num("sigterm"), sig_name_to_num("TERM"));
    }

    #[test]
    fn rejects_out_of_range_and_unknown() {
        assert_eq!(sig_name_to_num("0"), None);
        assert_eq!(sig_name_to_num(&SIGRTMAX.to_string()), None);
        assert_eq!(sig_name_to_num("NOTASIGNAL"), None);
    }

    #[test]
    fn signal_spec_defaults_seconds_to_60() {
        let spec = parse_signal_spec("TERM").unwrap();
        assert_eq!(spec.seconds, 60);
        assert!(!spec.batch);
    }

    #[test]
    fn signal_spec_with_batch_and_lead_time() {
        let spec = parse_signal_spec("B:USR1@30").unwrap();
        assert!(spec.batch);
        assert_eq!(spec.seconds, 30);
        assert_eq!(spec.signal, sig_name_to_num("USR1").unwrap());
    }
}
