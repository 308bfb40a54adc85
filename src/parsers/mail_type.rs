//! Mail-type list parsing: a comma-separated set of notification
//! triggers, with `ALL` expanding to a documented subset and `NONE`
//! yielding the empty set.

use bitflags::bitflags;

bitflags! {
    /// Bitmask of mail-notification triggers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MailType: u32 {
        /// Notify when the job begins.
        const BEGIN = 1 << 0;
        /// Notify when the job ends.
        const END = 1 << 1;
        /// Notify when the job fails.
        const FAIL = 1 << 2;
        /// Notify when the job is requeued.
        const REQUEUE = 1 << 3;
        /// Notify for each array-task completion.
        const ARRAY_TASKS = 1 << 4;
        /// Notify when staging out completes.
        const STAGE_OUT = 1 << 5;
        /// Notify when the time limit is reached.
        const TIME_LIMIT = 1 << 6;
        /// Notify at 90% of the time limit.
        const TIME_LIMIT_90 = 1 << 7;
        /// Notify at 80% of the time limit.
        const TIME_LIMIT_80 = 1 << 8;
        /// Notify at 50% of the time limit.
        const TIME_LIMIT_50 = 1 << 9;
    }
}

/// Parse a comma-separated mail-type list.
///
/// `NONE` alone yields the empty mask. `ALL` ORs in `BEGIN | END | FAIL |
/// REQUEUE | STAGE_OUT` — the documented subset, not every flag (the
/// `TIME_LIMIT*` variants are never implied by `ALL`). Unknown tokens
/// are ignored silently, matching the source behaviour.
pub fn parse_mail_type(s: &str) -> MailType {
    let mut mask = MailType::empty();
    for tok in s.split(',') {
        let tok = tok.trim();
        match tok.to_ascii_uppercase().as_str() {
            "NONE" => return MailType::empty(),
            "BEGIN" => mask |= MailType::BEGIN,
            "END" => mask |= MailType::END,
            "FAIL" => mask |= MailType::FAIL,
            "REQUEUE" => mask |= MailType::REQUEUE,
            "ARRAY_TASKS" => mask |= MailType::ARRAY_TASKS,
            "STAGE_OUT" => mask |= MailType::STAGE_OUT,
            "TIME_LIMIT" => mask |= MailType::TIME_LIMIT,
            "TIME_LIMIT_90" => mask |= MailType::TIME_LIMIT_90,
            "TIME_LIMIT_80" => mask |= MailType::TIME_LIMIT_80,
            "TIME_LIMIT_50" => mask |= MailType::TIME_LIMIT_50,
            "ALL" => {
                mask |= MailType::BEGIN
                    | MailType::END
                    | MailType::FAIL
                    | MailType::REQUEUE
                    | MailType::STAGE_OUT;
            }
            _ => {} // unknown tokens are ignored
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_alone_is_empty() {
        assert_eq!(parse_mail_type("NONE"), MailType::empty());
    }

    #[test]
    fn all_is_a_documented_subset() {
        let mask = parse_mail_type("ALL");
        assert!(mask.contains(MailType::BEGIN));
        assert!(mask.contains(MailType::END));
        assert!(mask.contains(MailType::FAIL));
        assert!(!mask.contains(MailType::TIME_LIMIT));
        assert!(!mask.contains(MailType::TIME_LIMIT_90));
    }

    #[test]
    fn comma_separated_union() {
        let mask = parse_mail_type("BEGIN,FAIL");
        assert_eq!(mask, MailType::BEGIN | MailType::FAIL);
    }

    #[test]
    fn unknown_tokens_ignored_silently() {
        let mask = parse_mail_type("BEGIN,BOGUS");
        assert_eq!(mask, MailType::BEGIN);
    }
}
