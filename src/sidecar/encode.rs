//! Generate pass: writes the primary sidecar (header, per-entry framing and
//! metadata, per-block hash+ECC body stream) and the index sidecar in
//! lockstep, one marker offset at a time.

use std::io::{Read, Write};

use crate::ecm::EccManager;
use crate::error::SidecarError;
use crate::rs::RsCodec;

use super::format::{ENTRY_MARKER, FIELD_MARKER};
use super::index::{append_record, index_codec, MarkerType};
use super::rate_plan::BlockProducer;
use super::SidecarConfig;

/// One input file to archive: its path as recorded in the sidecar and an
/// already-open reader positioned at byte 0. Directory traversal and path
/// resolution are the caller's job; this module only streams bytes.
pub struct Entry<R: Read> {
    pub relative_path: String,
    pub filesize: u64,
    pub reader: R,
}

/// Wraps a `Write` to track how many bytes have flowed through it, so the
/// index sidecar can record marker offsets without requiring `Seek` on the
/// primary (the primary can be a plain append sink).
struct CountingWriter<W: Write> {
    inner: W,
    pos: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        CountingWriter { inner, pos: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Writes the sidecar header: tool version, codeword length, region rate
/// plan, hasher name and body codec description, one `#`-prefixed line
/// each. The decode side never parses this back into a `SidecarConfig`
/// (config is always supplied by the caller) -- it exists purely for human
/// inspection and to skip over at decode time via the first entry marker.
pub fn write_header<W: Write>(w: &mut W, config: &SidecarConfig, body_codec: &RsCodec) -> std::io::Result<()> {
    let rp = &config.rate_plan;
    writeln!(w, "# file-fixity sidecar version={}", super::format::FORMAT_VERSION)?;
    writeln!(w, "# n={}", config.n)?;
    writeln!(w, "# header_size={}", rp.header_size)?;
    writeln!(w, "# rates={},{},{}", rp.rates[0], rp.rates[1], rp.rates[2])?;
    writeln!(w, "# hasher={}", config.hasher.name())?;
    writeln!(w, "# codec={}", EccManager::new(body_codec).description())?;
    writeln!(w, "# intra_rate={}", config.intra_rate)?;
    Ok(())
}

/// Generates a full sidecar pair (`primary`, `index`) for `entries`, which
/// must already be in the order the decode pass should report them in.
pub fn generate<R, W, IW>(
    primary: W,
    index: &mut IW,
    config: &SidecarConfig,
    entries: impl IntoIterator<Item = Entry<R>>,
) -> Result<(), SidecarError>
where
    R: Read,
    W: Write,
    IW: Write,
{
    let body_codec = RsCodec::new(config.n, config.field_params)?;
    let intra_codec = RsCodec::new(config.n, config.field_params)?;
    let intra_k = super::rate_plan::RegionRatePlan::k_for_rate(config.n, config.intra_rate);
    let body_ecm = EccManager::new(&body_codec);
    let intra_ecm = EccManager::new(&intra_codec);

    let mut primary = CountingWriter::new(primary);
    write_header(&mut primary, config, &body_codec)?;

    for entry in entries {
        write_entry(&mut primary, index, &body_ecm, &intra_ecm, intra_k, config, entry)?;
    }
    primary.flush()?;
    index.flush()?;
    Ok(())
}

fn write_marker<W: Write, IW: Write>(
    primary: &mut CountingWriter<W>,
    index: &mut IW,
    index_codec: &RsCodec,
    marker_type: MarkerType,
    marker_bytes: &[u8],
) -> std::io::Result<()> {
    append_record(index, index_codec, marker_type, primary.pos)?;
    primary.write_all(marker_bytes)
}

fn write_entry<R: Read, W: Write, IW: Write>(
    primary: &mut CountingWriter<W>,
    index: &mut IW,
    body_ecm: &EccManager,
    intra_ecm: &EccManager,
    intra_k: usize,
    config: &SidecarConfig,
    mut entry: Entry<R>,
) -> Result<(), SidecarError> {
    let idx_codec = index_codec();

    write_marker(primary, index, &idx_codec, MarkerType::Entry, &ENTRY_MARKER)?;

    let path_bytes = entry.relative_path.as_bytes();
    primary.write_all(path_bytes)?;
    write_marker(primary, index, &idx_codec, MarkerType::Field, &FIELD_MARKER)?;

    let filesize_bytes = entry.filesize.to_string().into_bytes();
    primary.write_all(&filesize_bytes)?;
    write_marker(primary, index, &idx_codec, MarkerType::Field, &FIELD_MARKER)?;

    // A relative path longer than the intra-field codec's capacity can't be
    // shortened to fit; surface it as a proper error instead of panicking.
    let path_ecc = intra_ecm.encode(path_bytes, intra_k)?;
    primary.write_all(&path_ecc)?;
    write_marker(primary, index, &idx_codec, MarkerType::Field, &FIELD_MARKER)?;

    let filesize_ecc = intra_ecm.encode(&filesize_bytes, intra_k)?;
    primary.write_all(&filesize_ecc)?;
    write_marker(primary, index, &idx_codec, MarkerType::Field, &FIELD_MARKER)?;

    let plan = config.rate_plan.block_plan(config.n, entry.filesize);
    let producer = BlockProducer::new(&mut entry.reader, plan);
    write_body_blocks(primary, producer, config.hasher.as_ref(), body_ecm)?;

    log::debug!("wrote entry {} ({} bytes)", entry.relative_path, entry.filesize);
    Ok(())
}

/// Reads blocks off `producer` in order and writes each block's `hash || ecc`
/// pair to `primary`. The sequential build hashes and encodes one block at a
/// time so memory use stays independent of file size; the `parallel` build
/// below buffers one entry's blocks and fans the CPU-bound hash+ECC work out
/// across threads, then writes the results back in the original order so the
/// primary sidecar is byte-identical either way.
#[cfg(not(feature = "parallel"))]
fn write_body_blocks<R: std::io::Read, W: Write>(
    primary: &mut CountingWriter<W>,
    producer: BlockProducer<'_, R>,
    hasher: &(dyn crate::hasher::Hasher + Send + Sync),
    body_ecm: &EccManager,
) -> Result<(), SidecarError> {
    for block in producer {
        let (spec, bytes) = block?;
        let hash = hasher.hash(&bytes);
        let ecc = body_ecm.encode(&bytes, spec.k)?;
        primary.write_all(&hash)?;
        primary.write_all(&ecc)?;
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn write_body_blocks<R: std::io::Read, W: Write>(
    primary: &mut CountingWriter<W>,
    producer: BlockProducer<'_, R>,
    hasher: &(dyn crate::hasher::Hasher + Send + Sync),
    body_ecm: &EccManager,
) -> Result<(), SidecarError> {
    use rayon::prelude::*;

    let blocks: Vec<(super::rate_plan::BlockSpec, Vec<u8>)> = producer.collect::<std::io::Result<_>>()?;
    let encoded: Vec<Result<(Vec<u8>, Vec<u8>), SidecarError>> = blocks
        .par_iter()
        .map(|(spec, bytes)| {
            let hash = hasher.hash(bytes);
            let ecc = body_ecm.encode(bytes, spec.k)?;
            Ok((hash, ecc))
        })
        .collect();

    for pair in encoded {
        let (hash, ecc) = pair?;
        primary.write_all(&hash)?;
        primary.write_all(&ecc)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Blake3Eight;
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn generates_header_and_one_entry() {
        let config = SidecarConfig::standard(Arc::new(Blake3Eight::default()));
        let mut primary = Vec::new();
        let mut index = Vec::new();
        let data = b"hello world, this is file contents".to_vec();
        let entries = vec![Entry {
            relative_path: "a/b.txt".to_string(),
            filesize: data.len() as u64,
            reader: Cursor::new(data.clone()),
        }];
        generate(&mut primary, &mut index, &config, entries).unwrap();

        assert!(!primary.is_empty());
        assert!(!index.is_empty());
        // Header text precedes the first entry marker.
        let marker_pos = primary.windows(ENTRY_MARKER.len()).position(|w| w == ENTRY_MARKER);
        assert!(marker_pos.is_some());
        let header_text = String::from_utf8_lossy(&primary[..marker_pos.unwrap()]);
        assert!(header_text.contains("file-fixity sidecar"));
    }

    #[test]
    fn over_long_relative_path_errors_instead_of_panicking() {
        // intra_k = round(255 / 2.8) = 91 bytes; this path is longer than that.
        let config = SidecarConfig::standard(Arc::new(Blake3Eight::default()));
        let long_path = "a/".repeat(60) + "file.txt"; // well over 91 bytes
        let data = b"contents".to_vec();
        let mut primary = Vec::new();
        let mut index = Vec::new();
        let entries = vec![Entry {
            relative_path: long_path,
            filesize: data.len() as u64,
            reader: Cursor::new(data),
        }];
        let result = generate(&mut primary, &mut index, &config, entries);
        assert!(matches!(result, Err(SidecarError::Parameter(_))));
    }
}
