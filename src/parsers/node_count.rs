//! Node-count parsing: `"N"` or `"min-max"`, with optional `k`/`m` suffix.

use crate::error::SallocError;

/// A resolved `(min, max)` node-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCount {
    /// Minimum node count.
    pub min: u32,
    /// Maximum node count.
    pub max: u32,
}

/// Parse a node-count string.
///
/// `"N"` yields `(N, N)`. `"min-max"` yields `(min, max)` with
/// `max >= min`. A `k`/`K` suffix on either half multiplies that half by
/// 1024; `m`/`M` by 1024*1024. A value containing `/` is not a node
/// count at all — callers must treat it as a hostfile path before
/// reaching this parser.
pub fn parse_node_count(s: &str) -> Result<NodeCount, SallocError> {
    if s.contains('/') {
        return Err(SallocError::parse(
            "nodes",
            "looks like a hostfile path, not a node count",
        ));
    }
    if s.is_empty() {
        return Err(SallocError::parse("nodes", "empty node count"));
    }

    match s.split_once('-') {
        Some((lo, hi)) => {
            let min = parse_one(lo)?;
            let max = parse_one(hi)?;
            if max < min {
                return Err(SallocError::parse(
                    "nodes",
                    format!("max ({max}) is less than min ({min})"),
                ));
            }
            Ok(NodeCount { min, max })
        }
        None => {
            let n = parse_one(s)?;
            Ok(NodeCount { min: n, max: n })
        }
    }
}

fn parse_one(s: &str) -> Result<u32, SallocError> {
    if s.is_empty() || s.chars().next().is_some_and(char::is_whitespace) || s.ends_with(' ') {
        return Err(SallocError::parse("nodes", format!("invalid token '{s}'")));
    }
    let (digits, mult) = match s.as_bytes().last() {
        Some(b'k') | Some(b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm') | Some(b'M') => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };
    let base: u64 = digits
        .parse()
        .map_err(|_| SallocError::parse("nodes", format!("not a number: '{s}'")))?;
    let value = base
        .checked_mul(mult)
        .ok_or_else(|| SallocError::parse("nodes", format!("overflow: '{s}'")))?;
    u32::try_from(value).map_err(|_| SallocError::parse("nodes", format!("too large: '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("4", 4, 4)]
    #[test_case("2-8", 2, 8)]
    #[test_case("1k", 1024, 1024)]
    #[test_case("1K-2K", 1024, 2048)]
    fn valid(input: &str, min: u32, max: u32) {
        let nc = parse_node_count(input).unwrap();
        assert_eq!(nc.min, min);
        assert_eq!(nc.max, max);
    }

    #[test]
    fn rejects_hostfile_path() {
        assert!(parse_node_count("/etc/hosts").is_err());
    }

    #[test]
    fn rejects_max_less_than_min() {
        assert!(parse_node_count("8-2").is_err());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(parse_node_count(" 4").is_err());
        assert!(parse_node_count("4 ").is_err());
        assert!(parse_node_count("4 -8").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_node_count("abc").is_err());
        assert!(parse_node_count("4x").is_err());
    }

    #[test]
    fn node_count_law_for_small_range() {
        for n in 1u32..200 {
            let nc = parse_node_count(&n.to_string()).unwrap();
            assert_eq!(nc, NodeCount { min: n, max: n });
        }
        for a in 1u32..20 {
            for b in a..20 {
                let nc = parse_node_count(&format!("{a}-{b}")).unwrap();
                assert_eq!(nc, NodeCount { min: a, max: b });
            }
        }
    }
}
