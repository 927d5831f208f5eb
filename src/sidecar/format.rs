//! Wire constants for the primary and index sidecar formats (normative,
//! see crate-level docs): marker bytes, index record layout.

/// Frames the start of each ECC entry in the primary sidecar. Chosen (like
/// the donor crate's own magic number) to be an alternating pattern
/// unlikely to occur by chance in arbitrary binary data.
pub const ENTRY_MARKER: [u8; 10] = [0xFE, 0xFF, 0xFE, 0xFF, 0xFE, 0xFF, 0xFE, 0xFF, 0xFE, 0xFF];

/// Separates the four metadata fields within one entry.
pub const FIELD_MARKER: [u8; 5] = [0xFA, 0xFF, 0xFA, 0xFF, 0xFA];

pub const ENTRY_MARKER_TYPE: u8 = 1;
pub const FIELD_MARKER_TYPE: u8 = 2;

/// Index sidecar record layout: `type:u8, offset:u64_be, ecc:[u8; 18]`.
pub const INDEX_RECORD_LEN: usize = 27;
pub const INDEX_MESSAGE_LEN: usize = 9;
pub const INDEX_ECC_LEN: usize = INDEX_RECORD_LEN - INDEX_MESSAGE_LEN;

/// Field parameters fixed for the index sidecar's own RS(27,9) code,
/// independent of whatever field parameters the primary body ECC uses.
pub const INDEX_PRIM: u16 = 0x11b;
pub const INDEX_GENERATOR: u8 = 3;
pub const INDEX_FCR: u8 = 1;

/// Tool version embedded in the sidecar header text.
pub const FORMAT_VERSION: &str = "1";
