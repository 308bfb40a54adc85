//! Task-distribution string parsing: up to three colon-separated levels
//! (node, socket, core), an optional `plane` size, and `pack`/`nopack`
//! modifiers.

use crate::error::SallocError;

/// One level of a distribution specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistLevel {
    /// Contiguous blocks of tasks per node/socket/core.
    Block,
    /// Round-robin across nodes/sockets/cores.
    Cyclic,
    /// User-specified arbitrary mapping (node level only, in practice).
    Arbitrary,
    /// Round-robin, filling gaps left by uneven division.
    FCyclic,
    /// Blocked-cyclic layout with a fixed plane size (node level only).
    Plane,
}

/// A fully-resolved distribution (node level always present; socket and
/// core levels default per the inheritance rule below).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    /// Node-level layout.
    pub node: DistLevel,
    /// Socket-level layout.
    pub socket: DistLevel,
    /// Core-level layout.
    pub core: DistLevel,
    /// Plane size, when `node == DistLevel::Plane`.
    pub plane_size: Option<u32>,
    /// Whether tasks should be packed onto fewer nodes/sockets.
    pub pack: bool,
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution {
            node: DistLevel::Block,
            socket: DistLevel::Cyclic,
            core: DistLevel::Cyclic,
            plane_size: None,
            pack: false,
        }
    }
}

fn parse_level(tok: &str) -> Result<Option<DistLevel>, SallocError> {
    match tok {
        "*" => Ok(None),
        "block" => Ok(Some(DistLevel::Block)),
        "cyclic" => Ok(Some(DistLevel::Cyclic)),
        "arbitrary" => Ok(Some(DistLevel::Arbitrary)),
        "fcyclic" => Ok(Some(DistLevel::FCyclic)),
        t if t.starts_with("plane") => Ok(Some(DistLevel::Plane)),
        other => Err(SallocError::parse(
            "distribution",
            format!("unknown distribution token '{other}'"),
        )),
    }
}

/// Parse a `--distribution` value.
///
/// Up to three colon-separated levels (node, socket, core); `*` at a
/// level inherits: node defaults to `block`, socket defaults to
/// `cyclic`, core defaults to whatever socket resolved to. `plane` may
/// carry `=size`. Comma-separated extra tokens `pack`/`nopack` set the
/// pack bit. Unknown tokens are a hard error.
pub fn parse_distribution(s: &str) -> Result<Distribution, SallocError> {
    let (main_part, extras) = match s.split_once(',') {
        Some((m, e)) => (m, Some(e)),
        None => (s, None),
    };

    let levels: Vec<&str> = main_part.split(':').collect();
    if levels.is_empty() || levels.len() > 3 {
        return Err(SallocError::parse(
            "distribution",
            format!("too many levels in '{s}'"),
        ));
    }

    let mut plane_size = None;
    let mut resolved = [None, None, None];
    for (i, tok) in levels.iter().enumerate() {
        if let Some(size_str) = tok.strip_prefix("plane=") {
            let size: u32 = size_str.parse().map_err(|_| {
                SallocError::parse("distribution", format!("bad plane size: '{size_str}'"))
            })?;
            plane_size = Some(size);
            resolved[i] = Some(DistLevel::Plane);
        } else {
            resolved[i] = parse_level(tok)?;
        }
    }

    let node = resolved[0].unwrap_or(DistLevel::Block);
    let socket = resolved[1].unwrap_or(DistLevel::Cyclic);
    let core = resolved[2].unwrap_or(socket);

    let mut pack = false;
    if let Some(extras) = extras {
        for tok in extras.split(',') {
            match tok {
                "pack" => pack = true,
                "nopack" => pack = false,
                other => {
                    return Err(SallocError::parse(
                        "distribution",
                        format!("unknown distribution modifier '{other}'"),
                    ));
                }
            }
        }
    }

    Ok(Distribution {
        node,
        socket,
        core,
        plane_size,
        pack,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_level_inherits_rest() {
        let d = parse_distribution("cyclic").unwrap();
        assert_eq!(d.node, DistLevel::Cyclic);
        assert_eq!(d.socket, DistLevel::Cyclic);
        assert_eq!(d.core, DistLevel::Cyclic);
    }

    #[test]
    fn star_inherits_node_default() {
        let d = parse_distribution("*:cyclic").unwrap();
        assert_eq!(d.node, DistLevel::Block);
        assert_eq!(d.socket, DistLevel::Cyclic);
    }

    #[test]
    fn three_levels() {
        let d = parse_distribution("block:cyclic:fcyclic").unwrap();
        assert_eq!(d.node, DistLevel::Block);
        assert_eq!(d.socket, DistLevel::Cyclic);
        assert_eq!(d.core, DistLevel::FCyclic);
    }

    #[test]
    fn plane_with_size() {
        let d = parse_distribution("plane=4").unwrap();
        assert_eq!(d.node, DistLevel::Plane);
        assert_eq!(d.plane_size, Some(4));
    }

    #[test]
    fn pack_modifier() {
        let d = parse_distribution("block,pack").unwrap();
        assert!(d.pack);
    }

    #[test]
    fn unknown_token_is_hard_error() {
        assert!(parse_distribution("bogus").is_err());
        assert!(parse_distribution("block,bogus").is_err());
    }

    #[test]
    fn too_many_levels_rejected() {
        assert!(parse_distribution("block:cyclic:fcyclic:block").is_err());
    }
}
