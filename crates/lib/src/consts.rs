//! Format constants.

/// First line of every dependency database.
pub const DEPDB_FORMAT_VERSION: &str = "1";

/// Byte written after the last line of a cleanly closed dependency database.
pub const DEPDB_END_MARKER: u8 = b'\0';
