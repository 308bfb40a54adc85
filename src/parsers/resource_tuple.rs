//! Resource-tuple parsing: `S[:C[:T]]` (sockets[:cores[:threads]]), each
//! field a wildcard, a single count, or a `min-max` range.

use crate::error::SallocError;
use crate::parsers::node_count::NodeCount;

/// A resolved `S[:C[:T]]` resource tuple; each field is `None` when the
/// user supplied `*` or left it empty (wildcard / unset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceTuple {
    /// Sockets-per-node field.
    pub sockets: Option<NodeCount>,
    /// Cores-per-socket field.
    pub cores: Option<NodeCount>,
    /// Threads-per-core field.
    pub threads: Option<NodeCount>,
}

fn parse_field(tok: &str) -> Result<Option<NodeCount>, SallocError> {
    if tok.is_empty() || tok == "*" {
        return Ok(None);
    }
    match tok.split_once('-') {
        Some((lo, hi)) => {
            let min = parse_count(lo)?;
            let max = parse_count(hi)?;
            if max < min || min < 1 {
                return Err(SallocError::parse(
                    "resource-tuple",
                    format!("invalid range '{tok}'"),
                ));
            }
            Ok(Some(NodeCount { min, max }))
        }
        None => {
            let n = parse_count(tok)?;
            if n < 1 {
                return Err(SallocError::parse(
                    "resource-tuple",
                    format!("must be >= 1: '{tok}'"),
                ));
            }
            Ok(Some(NodeCount { min: n, max: n }))
        }
    }
}

fn parse_count(tok: &str) -> Result<u32, SallocError> {
    let (digits, mult) = match tok.as_bytes().last() {
        Some(b'k') | Some(b'K') => (&tok[..tok.len() - 1], 1024u64),
        Some(b'm') | Some(b'M') => (&tok[..tok.len() - 1], 1024 * 1024),
        Some(b'g') | Some(b'G') => (&tok[..tok.len() - 1], 1024 * 1024 * 1024),
        _ => (tok, 1),
    };
    let base: u64 = digits
        .parse()
        .map_err(|_| SallocError::parse("resource-tuple", format!("not a number: '{tok}'")))?;
    let value = base.checked_mul(mult).ok_or_else(|| {
        SallocError::parse("resource-tuple", format!("overflow: '{tok}'"))
    })?;
    u32::try_from(value)
        .map_err(|_| SallocError::parse("resource-tuple", format!("too large: '{tok}'")))
}

/// Parse a `S[:C[:T]]` resource tuple.
pub fn parse_resource_tuple(s: &str) -> Result<ResourceTuple, SallocError> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 3 {
        return Err(SallocError::parse(
            "resource-tuple",
            format!("too many fields in '{s}'"),
        ));
    }
    Ok(ResourceTuple {
        sockets: parts.first().map(|t| parse_field(t)).transpose()?.flatten(),
        cores: parts.get(1).map(|t| parse_field(t)).transpose()?.flatten(),
        threads: parts.get(2).map(|t| parse_field(t)).transpose()?.flatten(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_fields_are_none() {
        let rt = parse_resource_tuple("*:*:*").unwrap();
        assert_eq!(rt, ResourceTuple::default());
    }

    #[test]
    fn single_values() {
        let rt = parse_resource_tuple("2:4:1").unwrap();
        assert_eq!(rt.sockets, Some(NodeCount { min: 2, max: 2 }));
        assert_eq!(rt.cores, Some(NodeCount { min: 4, max: 4 }));
        assert_eq!(rt.threads, Some(NodeCount { min: 1, max: 1 }));
    }

    #[test]
    fn ranges_and_suffix() {
        let rt = parse_resource_tuple("1-2k:4-8").unwrap();
        assert_eq!(
            rt.sockets,
            Some(NodeCount {
                min: 1,
                max: 2048
            })
        );
        assert_eq!(rt.cores, Some(NodeCount { min: 4, max: 8 }));
        assert_eq!(rt.threads, None);
    }

    #[test]
    fn rejects_bad_range() {
        assert!(parse_resource_tuple("8-2").is_err());
        assert!(parse_resource_tuple("0").is_err());
    }
}
