//! Streaming marker scanning shared by the decode and header-skip paths.
//!
//! Reads byte-by-byte through a buffered reader, which keeps memory use
//! bounded regardless of how far a marker is from the current position
//! (the donor crate's own streaming reads follow the same shape, just
//! against a fixed magic number instead of a variable marker).

use std::collections::VecDeque;
use std::io::{BufRead, Read};

/// Reads from `r` until `marker` is found (consuming it) or EOF. Returns
/// the bytes read *before* the marker (not including it) and whether the
/// marker was actually found.
pub fn read_until_marker<R: BufRead>(r: &mut R, marker: &[u8]) -> std::io::Result<(Vec<u8>, bool)> {
    let mut window: VecDeque<u8> = VecDeque::with_capacity(marker.len());
    let mut skipped = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match r.read(&mut byte) {
            Ok(0) => return Ok((skipped, false)),
            Ok(_) => {
                window.push_back(byte[0]);
                if window.len() > marker.len() {
                    skipped.push(window.pop_front().unwrap());
                }
                if window.len() == marker.len() && window.iter().eq(marker.iter()) {
                    return Ok((skipped, true));
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Reads exactly up to (but not including) the next occurrence of `marker`,
/// or to EOF if the marker never appears; same semantics as
/// [`read_until_marker`] but implemented directly over any `Read` via a
/// small internal buffer, for callers without a `BufRead`.
pub fn read_until_marker_unbuffered<R: Read>(r: &mut R, marker: &[u8]) -> std::io::Result<(Vec<u8>, bool)> {
    let mut reader = std::io::BufReader::with_capacity(64 * 1024, r);
    read_until_marker(&mut reader, marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn finds_marker_and_returns_prefix() {
        let data = b"hello FEFEworld".to_vec();
        let marker = b"FEFE";
        let mut cursor = Cursor::new(data);
        let mut buffered = std::io::BufReader::new(&mut cursor);
        let (prefix, found) = read_until_marker(&mut buffered, marker).unwrap();
        assert!(found);
        assert_eq!(prefix, b"hello ");
    }

    #[test]
    fn reports_not_found_at_eof() {
        let data = b"no marker here".to_vec();
        let mut cursor = Cursor::new(data.clone());
        let mut buffered = std::io::BufReader::new(&mut cursor);
        let (prefix, found) = read_until_marker(&mut buffered, b"XYZ").unwrap();
        assert!(!found);
        assert_eq!(prefix, data);
    }
}
