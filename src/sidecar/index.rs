//! Secondary index sidecar: fixed-width, RS(27,9)-protected records
//! pointing at marker offsets in the primary. Exists because the ECC in
//! the primary is worthless if the framing that locates it is destroyed.

use std::io::{Read, Write};

use crate::rs::{FieldParams, RsCodec};

use super::format::{
    ENTRY_MARKER_TYPE, FIELD_MARKER_TYPE, INDEX_FCR, INDEX_GENERATOR, INDEX_MESSAGE_LEN,
    INDEX_PRIM, INDEX_RECORD_LEN,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerType {
    Entry,
    Field,
}

impl MarkerType {
    pub fn as_u8(self) -> u8 {
        match self {
            MarkerType::Entry => ENTRY_MARKER_TYPE,
            MarkerType::Field => FIELD_MARKER_TYPE,
        }
    }

    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            ENTRY_MARKER_TYPE => Some(MarkerType::Entry),
            FIELD_MARKER_TYPE => Some(MarkerType::Field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    pub marker_type: MarkerType,
    pub offset: u64,
}

/// Build the codec used for index records: fixed field parameters
/// independent of whatever the primary body ECC uses (normative §6.2).
pub fn index_codec() -> RsCodec {
    RsCodec::new(
        INDEX_RECORD_LEN,
        FieldParams { prim: INDEX_PRIM, generator: INDEX_GENERATOR, fcr: INDEX_FCR },
    )
    .expect("fixed index RS parameters are always valid")
}

impl IndexRecord {
    fn prefix(&self) -> [u8; INDEX_MESSAGE_LEN] {
        let mut out = [0u8; INDEX_MESSAGE_LEN];
        out[0] = self.marker_type.as_u8();
        out[1..9].copy_from_slice(&self.offset.to_be_bytes());
        out
    }

    /// Encode this record to its 27-byte on-disk form.
    pub fn encode(&self, codec: &RsCodec) -> [u8; INDEX_RECORD_LEN] {
        let codeword = codec.encode(&self.prefix(), INDEX_MESSAGE_LEN).expect("k=9 < n=27 always valid");
        let mut out = [0u8; INDEX_RECORD_LEN];
        out.copy_from_slice(&codeword);
        out
    }

    pub fn write_to<W: Write>(&self, w: &mut W, codec: &RsCodec) -> std::io::Result<()> {
        w.write_all(&self.encode(codec))
    }

    /// Decode a possibly-corrupted 27-byte block. Returns `None` if the
    /// prefix could not be recovered (`MarkerMisdetection`: the caller
    /// skips this record with a warning but keeps processing others).
    pub fn decode(block: &[u8; INDEX_RECORD_LEN], codec: &RsCodec) -> Option<IndexRecord> {
        let corrected = codec.decode(block, INDEX_MESSAGE_LEN, &[], false).ok()?;
        let marker_type = MarkerType::from_u8(corrected[0])?;
        let mut offset_bytes = [0u8; 8];
        offset_bytes.copy_from_slice(&corrected[1..9]);
        Some(IndexRecord { marker_type, offset: u64::from_be_bytes(offset_bytes) })
    }

    pub fn read_from<R: Read>(r: &mut R, codec: &RsCodec) -> std::io::Result<Option<IndexRecord>> {
        let mut block = [0u8; INDEX_RECORD_LEN];
        match r.read_exact(&mut block) {
            Ok(()) => Ok(Self::decode(&block, codec)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Appends one record each for `offset` (i.e. the caller writes one of
/// these per marker it emits into the primary).
pub fn append_record<W: Write>(
    w: &mut W,
    codec: &RsCodec,
    marker_type: MarkerType,
    offset: u64,
) -> std::io::Result<()> {
    IndexRecord { marker_type, offset }.write_to(w, codec)
}

/// Iterate every decodable record in an index sidecar stream. Records whose
/// prefix can't be recovered are silently skipped (counted separately by
/// callers that care, e.g. `repair::index_backed`).
pub struct IndexRecordIter<'a, R: Read> {
    reader: &'a mut R,
    codec: RsCodec,
}

impl<'a, R: Read> IndexRecordIter<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        IndexRecordIter { reader, codec: index_codec() }
    }
}

impl<'a, R: Read> Iterator for IndexRecordIter<'a, R> {
    type Item = std::io::Result<Option<IndexRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut block = [0u8; INDEX_RECORD_LEN];
        match self.reader.read_exact(&mut block) {
            Ok(()) => Some(Ok(IndexRecord::decode(&block, &self.codec))),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_through_encode_decode() {
        let codec = index_codec();
        let rec = IndexRecord { marker_type: MarkerType::Entry, offset: 123456 };
        let block = rec.encode(&codec);
        assert_eq!(block.len(), INDEX_RECORD_LEN);
        let back = IndexRecord::decode(&block, &codec).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn survives_heavy_corruption_within_bound() {
        let codec = index_codec();
        let rec = IndexRecord { marker_type: MarkerType::Field, offset: 99 };
        let mut block = rec.encode(&codec);
        // nsym = 18, corrupting up to 9 bytes (errors) stays decodable.
        for i in 0..8 {
            block[i] ^= 0xFF;
        }
        let back = IndexRecord::decode(&block, &codec);
        assert_eq!(back, Some(rec));
    }

    #[test]
    fn stream_iteration_finds_all_records() {
        let codec = index_codec();
        let mut buf = Vec::new();
        append_record(&mut buf, &codec, MarkerType::Entry, 0).unwrap();
        append_record(&mut buf, &codec, MarkerType::Field, 17).unwrap();
        let mut cursor = Cursor::new(buf);
        let records: Vec<_> =
            IndexRecordIter::new(&mut cursor).filter_map(|r| r.ok().flatten()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].offset, 17);
    }
}
