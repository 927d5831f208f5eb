//! The sidecar engine (SIDE): the actual archival logic. Walks a file set
//! (the walker itself is an external collaborator, see [`mod@crate`] docs),
//! chooses per-region rates, writes ECC entries into a primary sidecar with
//! framing markers, writes marker offsets into a secondary index sidecar,
//! and on the way back locates entries, validates them, and repairs
//! damaged files and/or the sidecar's own framing.

pub mod decode;
pub mod encode;
pub mod format;
pub mod index;
pub mod rate_plan;
pub mod repair;
pub mod scan;

use std::sync::Arc;

use crate::hasher::Hasher;
use crate::rs::FieldParams;
use rate_plan::RegionRatePlan;

/// Everything needed to generate or check a sidecar: the codeword length
/// shared by every region's body ECC, the region rate plan, the field
/// parameters, and the hasher used per block.
#[derive(Clone)]
pub struct SidecarConfig {
    pub n: usize,
    pub rate_plan: RegionRatePlan,
    pub field_params: FieldParams,
    pub hasher: Arc<dyn Hasher + Send + Sync>,
    /// Resilience rate used for the per-entry intra-field metadata ECC
    /// (relative_path_ecc / filesize_ecc), independent of the three body
    /// region rates.
    pub intra_rate: f64,
}

impl SidecarConfig {
    pub fn standard(hasher: Arc<dyn Hasher + Send + Sync>) -> Self {
        SidecarConfig {
            n: 255,
            rate_plan: RegionRatePlan::default(),
            field_params: FieldParams::default(),
            hasher,
            intra_rate: 0.9,
        }
    }
}

/// Per-file outcome of a check/repair pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub relative_path: String,
    pub blocks_total: usize,
    pub blocks_corrected: usize,
    pub blocks_unrecoverable: usize,
}

impl FileReport {
    pub fn fully_repaired(&self) -> bool {
        self.blocks_unrecoverable == 0
    }
}

/// The verification report emitted after a check pass: one [`FileReport`]
/// per entry, in the order entries were encountered in the primary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub files: Vec<FileReport>,
}

impl VerificationReport {
    /// `0` if every file fully verified or was fully repaired, `1` if any
    /// file has unrecoverable blocks remaining -- the library-level
    /// equivalent of the CLI's exit codes (§6.4), returned as data instead
    /// of calling `std::process::exit`.
    pub fn exit_code(&self) -> i32 {
        if self.files.iter().all(FileReport::fully_repaired) {
            0
        } else {
            1
        }
    }
}
