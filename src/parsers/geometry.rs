//! Geometry-string parsing: `N` colon- or cross-separated positive
//! integers, one per system dimension.

use crate::error::SallocError;

/// Parse a geometry string such as `"2x2x2"` or `"2:2:2"` into a vector
/// of per-dimension extents. Every component must be strictly positive.
pub fn parse_geometry(s: &str) -> Result<Vec<u32>, SallocError> {
    if s.is_empty() {
        return Err(SallocError::parse("geometry", "empty geometry"));
    }
    let sep = if s.contains('x') { 'x' } else { ':' };
    s.split(sep)
        .map(|tok| {
            let n: u32 = tok
                .parse()
                .map_err(|_| SallocError::parse("geometry", format!("not a number: '{tok}'")))?;
            if n == 0 {
                return Err(SallocError::parse(
                    "geometry",
                    format!("dimension must be > 0: '{tok}'"),
                ));
            }
            Ok(n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_separated() {
        assert_eq!(parse_geometry("2:3:4").unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn cross_separated() {
        assert_eq!(parse_geometry("2x3x4").unwrap(), vec![2, 3, 4]);
    }

    #[test]
    fn rejects_zero_dimension() {
        assert!(parse_geometry("0:2").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_geometry("a:b").is_err());
        assert!(parse_geometry("").is_err());
    }
}
