//! Memory-size parsing: decimal integer with an optional `K/M/G/T` suffix,
//! always resolved to MB.

use crate::error::SallocError;

/// Parse a memory-size string into megabytes.
///
/// Suffixes `K`, `M`, `G`, `T` scale by `2^10`, `2^20`, `2^30`, `2^40`
/// respectively; the result is divided back down to MB. No suffix means
/// the value is already in the default unit, which is MB unless
/// `default_gbytes` requests GB.
pub fn parse_mem_mb(s: &str, default_gbytes: bool) -> Result<u64, SallocError> {
    if s.is_empty() {
        return Err(SallocError::parse("mem", "empty memory value"));
    }
    let (digits, unit_pow2) = match s.as_bytes().last() {
        Some(b'K') | Some(b'k') => (&s[..s.len() - 1], 10),
        Some(b'M') | Some(b'm') => (&s[..s.len() - 1], 20),
        Some(b'G') | Some(b'g') => (&s[..s.len() - 1], 30),
        Some(b'T') | Some(b't') => (&s[..s.len() - 1], 40),
        _ => (s, if default_gbytes { 30 } else { 20 }),
    };
    let n: u64 = digits
        .parse()
        .map_err(|_| SallocError::parse("mem", format!("not a number: '{s}'")))?;
    // bytes = n * 2^unit_pow2; MB = bytes / 2^20, rounded up.
    let shift = unit_pow2 - 20;
    if unit_pow2 >= 20 {
        Ok(n.checked_shl(shift as u32)
            .ok_or_else(|| SallocError::parse("mem", format!("overflow: '{s}'")))?)
    } else {
        let divisor = 1u64 << (20 - unit_pow2);
        Ok(n.div_ceil(divisor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_law() {
        for n in [0u64, 1, 2, 1023, 1024, 5000] {
            assert_eq!(parse_mem_mb(&format!("{n}K"), false).unwrap(), n.div_ceil(1024));
            assert_eq!(parse_mem_mb(&format!("{n}M"), false).unwrap(), n);
            assert_eq!(parse_mem_mb(&format!("{n}G"), false).unwrap(), 1024 * n);
            assert_eq!(
                parse_mem_mb(&format!("{n}T"), false).unwrap(),
                1024 * 1024 * n
            );
        }
    }

    #[test]
    fn no_suffix_defaults_to_mb() {
        assert_eq!(parse_mem_mb("512", false).unwrap(), 512);
    }

    #[test]
    fn default_gbytes_toggle() {
        assert_eq!(parse_mem_mb("2", true).unwrap(), 2048);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_mem_mb("abc", false).is_err());
        assert!(parse_mem_mb("", false).is_err());
    }
}
