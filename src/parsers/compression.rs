//! Compression-type parsing for file-broadcast / I/O staging options.

/// A supported stream-compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// zlib/deflate.
    Zlib,
    /// lz4 block compression.
    Lz4,
    /// No compression.
    None,
}

/// Compile-time default compression scheme, used when the caller passes
/// an empty string.
pub const DEFAULT_COMPRESSION: Compression = Compression::Zlib;

/// Parse a `zlib|lz4|none` compression selector. An empty string selects
/// [`DEFAULT_COMPRESSION`]; anything else downgrades to `none` with the
/// returned boolean set to indicate a warning should be logged.
pub fn parse_compression(s: &str) -> (Compression, bool) {
    match s {
        "" => (DEFAULT_COMPRESSION, false),
        "zlib" => (Compression::Zlib, false),
        "lz4" => (Compression::Lz4, false),
        "none" => (Compression::None, false),
        _ => (Compression::None, true),
    }
}
