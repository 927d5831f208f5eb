//! Two sidecar-framing repair strategies, run in order: first the index
//! sidecar (cheap, exact when its own ECC holds), then a Hamming-distance
//! heuristic over the primary's raw bytes as a fallback when the index
//! itself is damaged or missing.
//!
//! Grounded directly in the two-pass repair pipeline of the original
//! Python tool this format is interoperable with: locate markers via the
//! index first, then fall back to fuzzy matching against the marker
//! patterns themselves.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::SidecarError;

use super::format::{ENTRY_MARKER, FIELD_MARKER};
use super::index::{index_codec, IndexRecordIter, MarkerType};

/// Fraction of mismatched bytes (out of a marker's length) still considered
/// "this is that marker, just corrupted" by the Hamming heuristic.
pub const DEFAULT_HAMMING_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairStats {
    pub markers_fixed: usize,
    pub markers_skipped: usize,
}

/// Repairs primary-sidecar framing using the index sidecar's recorded
/// offsets: for every index record that decodes cleanly, overwrites the
/// primary at that offset with the canonical marker bytes. Records whose
/// own ECC can't recover them are skipped with a warning (a marker
/// misdetection) rather than aborting the whole repair.
pub fn index_backed<P: Read + Write + Seek, I: Read>(
    primary: &mut P,
    index: &mut I,
) -> Result<RepairStats, SidecarError> {
    let _codec = index_codec();
    let mut stats = RepairStats::default();
    for rec in IndexRecordIter::new(index) {
        match rec? {
            Some(record) => {
                let canonical: &[u8] = match record.marker_type {
                    MarkerType::Entry => &ENTRY_MARKER,
                    MarkerType::Field => &FIELD_MARKER,
                };
                primary.seek(SeekFrom::Start(record.offset))?;
                primary.write_all(canonical)?;
                stats.markers_fixed += 1;
            }
            None => {
                stats.markers_skipped += 1;
                log::warn!("index record undecodable, skipping (marker misdetection)");
            }
        }
    }
    Ok(stats)
}

/// Repairs primary-sidecar framing by fuzzy-matching every fixed-length
/// window of the primary against the marker patterns, rewriting any window
/// within `threshold` Hamming distance to the canonical marker bytes. Reads
/// the whole primary into memory: framing repair is a one-shot structural
/// pass over a format whose size is the sidecar's own metadata, not the
/// (potentially huge) archived files it describes.
pub fn hamming_heuristic<P: Read + Write + Seek>(
    primary: &mut P,
    threshold: f64,
) -> Result<RepairStats, SidecarError> {
    let mut buf = Vec::new();
    primary.seek(SeekFrom::Start(0))?;
    primary.read_to_end(&mut buf)?;

    let mut stats = RepairStats::default();
    scan_and_fix(&mut buf, &ENTRY_MARKER, threshold, &mut stats);
    scan_and_fix(&mut buf, &FIELD_MARKER, threshold, &mut stats);

    primary.seek(SeekFrom::Start(0))?;
    primary.write_all(&buf)?;
    Ok(stats)
}

fn scan_and_fix(buf: &mut [u8], marker: &[u8], threshold: f64, stats: &mut RepairStats) {
    let len = marker.len();
    if buf.len() < len {
        return;
    }
    let mut i = 0usize;
    while i + len <= buf.len() {
        let distance = hamming(&buf[i..i + len], marker);
        let ratio = distance as f64 / len as f64;
        if ratio > threshold {
            i += 1;
            continue;
        }
        if distance == 0 {
            // Already canonical; skip past it so its own bytes can't be
            // re-matched as the start of another overlapping candidate.
            i += len;
            continue;
        }
        // Backtracking rule: within one marker-length of this candidate,
        // a closer candidate (smaller distance) replaces it.
        let mut best_pos = i;
        let mut best_dist = distance;
        let mut j = i + 1;
        while j < i + len && j + len <= buf.len() {
            let d = hamming(&buf[j..j + len], marker);
            if d as f64 / len as f64 <= threshold && d < best_dist {
                best_pos = j;
                best_dist = d;
            }
            j += 1;
        }
        buf[best_pos..best_pos + len].copy_from_slice(marker);
        stats.markers_fixed += 1;
        log::warn!("hamming-repaired marker at offset {best_pos} (distance {best_dist}/{len})");
        i = best_pos + len;
    }
}

fn hamming(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::index::{append_record, MarkerType};
    use std::io::Cursor;

    #[test]
    fn index_backed_restores_damaged_entry_marker() {
        let mut primary = ENTRY_MARKER.to_vec();
        primary.extend_from_slice(b"payload");
        primary[0] = b'a'; // damage one byte of the marker
        primary[1] = b'a';

        let codec = index_codec();
        let mut index_buf = Vec::new();
        append_record(&mut index_buf, &codec, MarkerType::Entry, 0).unwrap();

        let mut primary_cursor = Cursor::new(primary);
        let stats = index_backed(&mut primary_cursor, &mut Cursor::new(index_buf)).unwrap();
        assert_eq!(stats.markers_fixed, 1);
        assert_eq!(&primary_cursor.get_ref()[..ENTRY_MARKER.len()], &ENTRY_MARKER[..]);
    }

    #[test]
    fn hamming_heuristic_restores_within_threshold() {
        let mut primary = ENTRY_MARKER.to_vec();
        primary.extend_from_slice(b"payload with a ");
        primary.extend_from_slice(&FIELD_MARKER);
        // Damage 2 of 10 entry-marker bytes (20%, within 30% default) and
        // 1 of 5 field-marker bytes (20%).
        primary[0] = b'a';
        primary[3] = b'a';
        let field_marker_pos = ENTRY_MARKER.len() + "payload with a ".len();
        primary[field_marker_pos] = b'z';

        let mut cursor = Cursor::new(primary);
        let stats = hamming_heuristic(&mut cursor, DEFAULT_HAMMING_THRESHOLD).unwrap();
        assert_eq!(stats.markers_fixed, 2);
        let fixed = cursor.into_inner();
        assert_eq!(&fixed[..ENTRY_MARKER.len()], &ENTRY_MARKER[..]);
        assert_eq!(&fixed[field_marker_pos..field_marker_pos + FIELD_MARKER.len()], &FIELD_MARKER[..]);
    }

    #[test]
    fn hamming_heuristic_leaves_unrelated_text_alone() {
        let original = b"just some ordinary text with no markers at all".to_vec();
        let mut cursor = Cursor::new(original.clone());
        let stats = hamming_heuristic(&mut cursor, DEFAULT_HAMMING_THRESHOLD).unwrap();
        assert_eq!(stats.markers_fixed, 0);
        assert_eq!(cursor.into_inner(), original);
    }
}
