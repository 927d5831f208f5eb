//! Check / repair pass: walks the primary sidecar entry by entry, and for
//! each entry verifies the archived file's body against its per-block
//! hash+ECC stream, streaming the verified (and, where possible, repaired)
//! bytes to a separate output tree. The original is opened read-only and
//! is never modified.
//!
//! Framing (entry/field markers) is assumed intact here -- recovering a
//! damaged primary's framing is [`super::repair`]'s job, run first.

use std::io::{BufRead, Read, Write};
use std::path::Path;

use crate::ecm::EccManager;
use crate::error::{BlockOutcome, RsError, SidecarError};
use crate::hasher::Hasher;
use crate::rs::RsCodec;

use super::format::{ENTRY_MARKER, FIELD_MARKER};
use super::rate_plan::{BlockProducer, RegionRatePlan};
use super::{FileReport, SidecarConfig, VerificationReport};

struct ParsedEntry {
    relative_path: String,
    filesize: u64,
}

/// Skips the header by scanning for the first entry marker; returns an
/// error if none is ever found (`MissingStructure`, per §4.5 step 1).
fn skip_header<R: BufRead>(r: &mut R) -> Result<(), SidecarError> {
    let (_, found) = super::scan::read_until_marker(r, &ENTRY_MARKER)?;
    if !found {
        return Err(SidecarError::MissingStructure("no entry marker found in primary".into()));
    }
    Ok(())
}

/// Parses one entry's four metadata fields, assuming the entry marker has
/// already been consumed. Recovers `relative_path`/`filesize` through their
/// intra-field ECC when the raw bytes don't already check out.
fn parse_entry<R: BufRead>(
    r: &mut R,
    intra_ecm: &EccManager,
    intra_k: usize,
    intra_nsym: usize,
) -> Result<ParsedEntry, SidecarError> {
    let (path_bytes, found) = super::scan::read_until_marker(r, &FIELD_MARKER)?;
    if !found {
        return Err(SidecarError::MissingStructure("relative_path field marker missing".into()));
    }
    let (filesize_bytes, found) = super::scan::read_until_marker(r, &FIELD_MARKER)?;
    if !found {
        return Err(SidecarError::MissingStructure("filesize field marker missing".into()));
    }

    let mut path_ecc = vec![0u8; intra_nsym];
    r.read_exact(&mut path_ecc)?;
    expect_marker(r, &FIELD_MARKER)?;

    let mut filesize_ecc = vec![0u8; intra_nsym];
    r.read_exact(&mut filesize_ecc)?;
    expect_marker(r, &FIELD_MARKER)?;

    let relative_path = recover_text_field(intra_ecm, &path_bytes, &path_ecc, intra_k)
        .ok_or_else(|| SidecarError::MissingStructure("relative_path unrecoverable".into()))?;
    let filesize_text = recover_text_field(intra_ecm, &filesize_bytes, &filesize_ecc, intra_k)
        .ok_or_else(|| SidecarError::MissingStructure("filesize unrecoverable".into()))?;
    let filesize: u64 = filesize_text
        .trim()
        .parse()
        .map_err(|_| SidecarError::MissingStructure("filesize field is not an integer".into()))?;

    Ok(ParsedEntry { relative_path, filesize })
}

fn recover_text_field(ecm: &EccManager, raw: &[u8], ecc: &[u8], k: usize) -> Option<String> {
    if ecm.check(raw, ecc, k) {
        return String::from_utf8(raw.to_vec()).ok();
    }
    let (corrected, _) = ecm.decode(raw, ecc, k, false, 0, false).ok()?;
    String::from_utf8(corrected).ok()
}

fn expect_marker<R: Read>(r: &mut R, marker: &[u8]) -> Result<(), SidecarError> {
    let mut buf = vec![0u8; marker.len()];
    r.read_exact(&mut buf)?;
    if buf != marker {
        return Err(SidecarError::MissingStructure("expected field marker not found".into()));
    }
    Ok(())
}

/// Verifies `source` (the archived file, opened read-only) against its
/// body ECC stream and streams the verified/repaired bytes to `dest`, a
/// fresh file in a separate output tree -- the source is never written to
/// (§3.3: a check pass "streams verification/repair output to a separate
/// output tree without modifying originals").
fn check_entry<R: Read, S: Read, D: Write>(
    primary: &mut R,
    source: &mut S,
    dest: &mut D,
    hasher: &dyn Hasher,
    body_ecm: &EccManager,
    n: usize,
    rate_plan: &RegionRatePlan,
    filesize: u64,
    relative_path: &str,
) -> Result<FileReport, SidecarError> {
    let plan = rate_plan.block_plan(n, filesize);
    let digest_len = hasher.digest_len();
    let mut corrected = 0usize;
    let mut unrecoverable = 0usize;
    let blocks_total = plan.len();

    let producer = BlockProducer::new(source, plan);
    for block in producer {
        let (spec, file_bytes) = block?;

        let mut stored_hash = vec![0u8; digest_len];
        primary.read_exact(&mut stored_hash)?;
        let nsym = n - spec.k;
        let mut ecc = vec![0u8; nsym];
        primary.read_exact(&mut ecc)?;

        let outcome = verify_block(hasher, body_ecm, &file_bytes, &stored_hash, &ecc, spec.k);
        match outcome {
            BlockOutcome::Good => {
                dest.write_all(&file_bytes)?;
            }
            BlockOutcome::Corrected => {
                // verify_block already proved this decodes and re-hashes
                // clean; redo the decode to get the repaired bytes (cheap
                // relative to the I/O, keeps verify_block's signature simple).
                let (repaired, _) = body_ecm
                    .decode(&file_bytes, &ecc, spec.k, false, 0, false)
                    .expect("verify_block already confirmed this decodes");
                dest.write_all(&repaired)?;
                corrected += 1;
                log::warn!("corrected block at offset {} in {}", spec.offset, relative_path);
            }
            BlockOutcome::Unrecoverable(_) | BlockOutcome::NotACodeword => {
                // Per §7 propagation policy: pass the block through
                // unchanged rather than aborting the file.
                dest.write_all(&file_bytes)?;
                unrecoverable += 1;
                log::warn!("unrecoverable block at offset {} in {}", spec.offset, relative_path);
            }
        }
    }

    Ok(FileReport {
        relative_path: relative_path.to_string(),
        blocks_total,
        blocks_corrected: corrected,
        blocks_unrecoverable: unrecoverable,
    })
}

fn verify_block(
    hasher: &dyn Hasher,
    ecm: &EccManager,
    file_bytes: &[u8],
    stored_hash: &[u8],
    ecc: &[u8],
    k: usize,
) -> BlockOutcome {
    if hasher.hash(file_bytes) == stored_hash {
        return BlockOutcome::Good;
    }
    match ecm.decode(file_bytes, ecc, k, false, 0, false) {
        Ok((repaired, _)) => {
            if hasher.hash(&repaired) == stored_hash {
                BlockOutcome::Corrected
            } else {
                BlockOutcome::NotACodeword
            }
        }
        Err(e @ RsError::TooManyErrors) => BlockOutcome::Unrecoverable(e),
        Err(e) => BlockOutcome::Unrecoverable(e),
    }
}

/// Runs a full check/repair pass over a primary sidecar, resolving each
/// entry's `relative_path` against `input_root` (opened read-only) and
/// writing verified/repaired bytes under `output_root`, mirroring the same
/// relative path. Originals under `input_root` are never modified. One
/// entry's failure does not abort the pass (§5 fault isolation): entries
/// that can't be parsed or opened are skipped with a warning and omitted
/// from the report.
pub fn check_all<R: Read, P: AsRef<Path>, Q: AsRef<Path>>(
    primary: R,
    config: &SidecarConfig,
    input_root: P,
    output_root: Q,
) -> Result<VerificationReport, SidecarError> {
    let mut primary = std::io::BufReader::new(primary);
    skip_header(&mut primary)?;

    let body_codec = RsCodec::new(config.n, config.field_params)?;
    let intra_codec = RsCodec::new(config.n, config.field_params)?;
    let body_ecm = EccManager::new(&body_codec);
    let intra_ecm = EccManager::new(&intra_codec);
    let intra_k = RegionRatePlan::k_for_rate(config.n, config.intra_rate);
    let intra_nsym = config.n - intra_k;

    let mut report = VerificationReport::default();
    loop {
        // Entries after the first are preceded by a known-length marker
        // rather than a free scan, since the previous body stream's length
        // is fully determined by its filesize and rate plan.
        let mut marker_buf = [0u8; 10];
        match primary.read_exact(&mut marker_buf) {
            Ok(()) => {
                if marker_buf != ENTRY_MARKER {
                    return Err(SidecarError::MissingStructure(
                        "expected entry marker at computed offset".into(),
                    ));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let parsed = match parse_entry(&mut primary, &intra_ecm, intra_k, intra_nsym) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("skipping unparseable entry: {e}");
                continue;
            }
        };

        let source_path = input_root.as_ref().join(&parsed.relative_path);
        let mut source = match std::fs::File::open(&source_path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("skipping {}: {e}", parsed.relative_path);
                // Still have to consume this entry's body bytes to stay in
                // sync with the primary stream.
                let plan = config.rate_plan.block_plan(config.n, parsed.filesize);
                for spec in plan {
                    let mut buf = vec![0u8; config.hasher.digest_len() + (config.n - spec.k)];
                    primary.read_exact(&mut buf)?;
                }
                continue;
            }
        };

        let dest_path = output_root.as_ref().join(&parsed.relative_path);
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut dest = std::fs::File::create(&dest_path)?;

        let report_entry = check_entry(
            &mut primary,
            &mut source,
            &mut dest,
            config.hasher.as_ref(),
            &body_ecm,
            config.n,
            &config.rate_plan,
            parsed.filesize,
            &parsed.relative_path,
        )?;
        report.files.push(report_entry);
    }

    Ok(report)
}
