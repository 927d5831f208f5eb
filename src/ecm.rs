//! ECC manager: a stateless facade over [`RsCodec`] that handles shortening
//! (left-pad a short message) and puncturing (right-pad a truncated ECC),
//! so callers never deal with fixed-`n` bookkeeping directly.

use crate::error::ParameterError;
use crate::gf::Gf;
use crate::poly::Poly;
use crate::rs::RsCodec;

/// Result of [`EccManager::pad`]/[`EccManager::rpad`]: the padded buffer and
/// how many bytes of padding were added (0 if none was needed).
pub struct Padded {
    pub bytes: Vec<u8>,
    pub pad_len: usize,
}

pub struct EccManager<'a> {
    codec: &'a RsCodec,
}

impl<'a> EccManager<'a> {
    pub fn new(codec: &'a RsCodec) -> Self {
        EccManager { codec }
    }

    /// Left-pad `message` with zero bytes up to `k`, recording how many
    /// bytes were added so the caller can strip them back out post-decode.
    /// Errors if `message` is longer than `k`: shortening only ever adds
    /// padding, it can't silently truncate data that doesn't fit this
    /// block's capacity.
    pub fn pad(&self, message: &[u8], k: usize) -> Result<Padded, ParameterError> {
        if message.len() > k {
            return Err(ParameterError::MessageTooLong { len: message.len(), k });
        }
        if message.len() == k {
            return Ok(Padded { bytes: message.to_vec(), pad_len: 0 });
        }
        let pad_len = k - message.len();
        let mut bytes = vec![0u8; pad_len];
        bytes.extend_from_slice(message);
        Ok(Padded { bytes, pad_len })
    }

    /// Right-pad `ecc` with zero bytes up to `n - k`, for a sidecar whose
    /// trailing ECC bytes were lost to framing misdetection; the decoder
    /// just sees the missing bytes as erasures if the caller flags them.
    pub fn rpad(&self, ecc: &[u8], k: usize) -> Padded {
        let nsym = self.codec.n() - k;
        if ecc.len() >= nsym {
            return Padded { bytes: ecc.to_vec(), pad_len: 0 };
        }
        let pad_len = nsym - ecc.len();
        let mut bytes = ecc.to_vec();
        bytes.extend(std::iter::repeat(0u8).take(pad_len));
        Padded { bytes, pad_len }
    }

    /// Encode `message` (at most `k` bytes) into its `n - k` ECC bytes.
    /// Errors (rather than panicking) if `message` is longer than `k` --
    /// reachable on ordinary input such as an over-long relative path, not
    /// just a codec misconfiguration.
    pub fn encode(&self, message: &[u8], k: usize) -> Result<Vec<u8>, ParameterError> {
        let padded = self.pad(message, k)?;
        let codeword = self.codec.encode(&padded.bytes, k).expect("pad guarantees exactly k bytes");
        Ok(codeword[k..].to_vec())
    }

    /// Decode `message`+`ecc`, both of which may be corrupted. If
    /// `enable_erasures`, positions of `erasure_char` in the padded
    /// message+ecc concatenation are treated as known-erased. Returns the
    /// depadded message and the (possibly corrected) ecc bytes.
    pub fn decode(
        &self,
        message: &[u8],
        ecc: &[u8],
        k: usize,
        enable_erasures: bool,
        erasure_char: u8,
        only_erasures: bool,
    ) -> Result<(Vec<u8>, Vec<u8>), crate::error::RsError> {
        let padded_msg = self.pad(message, k)?;
        let padded_ecc = self.rpad(ecc, k);

        let mut combined = padded_msg.bytes.clone();
        combined.extend_from_slice(&padded_ecc.bytes);

        let erasures: Vec<usize> = if enable_erasures {
            let mut positions: Vec<usize> =
                combined.iter().enumerate().filter(|&(_, &b)| b == erasure_char).map(|(i, _)| i).collect();
            // Bytes we ourselves padded in are known-erased even if they
            // don't happen to equal erasure_char.
            positions.extend(0..padded_msg.pad_len);
            positions.extend((k + padded_ecc.bytes.len() - padded_ecc.pad_len)..combined.len());
            positions.sort_unstable();
            positions.dedup();
            positions
        } else {
            Vec::new()
        };

        let corrected = self.codec.decode(&combined, k, &erasures, only_erasures)?;
        let message_out = corrected[padded_msg.pad_len..k].to_vec();
        let ecc_out = corrected[k..].to_vec();
        Ok((message_out, ecc_out))
    }

    /// `true` iff `message ⟂ ecc` (after padding) is a valid codeword. A
    /// `message` too long to pad is simply not a valid codeword for this
    /// block, so this returns `false` rather than propagating an error.
    pub fn check(&self, message: &[u8], ecc: &[u8], k: usize) -> bool {
        let padded_msg = match self.pad(message, k) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let padded_ecc = self.rpad(ecc, k);
        let mut combined = padded_msg.bytes;
        combined.extend_from_slice(&padded_ecc.bytes);
        self.codec.check(&combined, k)
    }

    /// A one-line description embedded verbatim in sidecar headers.
    pub fn description(&self) -> String {
        let gf = self.codec.field();
        format!(
            "Reed-Solomon over GF(2^8), prim=0x{:x}, generator={}, n={}",
            gf.prim,
            gf.generator,
            self.codec.n()
        )
    }
}

/// Bounded exhaustive search recovering `(prim, generator, fcr)` for an
/// unlabelled codeword sample, given a plaintext sample. Used to recover
/// parameters a user has forgotten; not needed in the normal generate/check
/// path, where parameters are always known from the sidecar header.
pub fn detect_field_params(plaintext: &[u8], codeword_sample: &[u8]) -> Option<(u16, u8, u8)> {
    if codeword_sample.len() <= plaintext.len() {
        return None;
    }
    let k = plaintext.len();
    let n = codeword_sample.len();
    let mut best: Option<(u16, u8, u8, u32)> = None;
    for &generator in &crate::gf::CANDIDATE_GENERATORS {
        for &prim in &crate::gf::PRIME_POLYS {
            let gf = Gf::new(prim, generator);
            for fcr in 0u16..255 {
                let codeword = encode_trial(&gf, plaintext, k, n, fcr as u8);
                let distance = hamming_distance(&codeword, codeword_sample);
                if best.map(|(_, _, _, d)| distance < d).unwrap_or(true) {
                    best = Some((prim, generator, fcr as u8, distance));
                    if distance == 0 {
                        return Some((prim, generator, fcr as u8));
                    }
                }
            }
        }
    }
    best.map(|(prim, gen, fcr, _)| (prim, gen, fcr))
}

fn encode_trial(gf: &Gf, message: &[u8], k: usize, n: usize, fcr: u8) -> Vec<u8> {
    let nsym = n - k;
    let mut g = Poly::one();
    for i in 0..nsym {
        let root = gf.alpha_pow(fcr as i32 + i as i32);
        g = g.mul(gf, &Poly::new(vec![1, root]));
    }
    let mut shifted = message.to_vec();
    shifted.extend(std::iter::repeat(0u8).take(nsym));
    let (_, remainder) = Poly::new_untrimmed(shifted).synthetic_divmod_monic(gf, &g);
    let mut ecc = vec![0u8; nsym];
    let rem = remainder.coeffs();
    let off = nsym - rem.len().min(nsym);
    ecc[off..].copy_from_slice(rem);
    let mut out = message.to_vec();
    out.extend_from_slice(&ecc);
    out
}

fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b.iter()).map(|(&x, &y)| (x != y) as u32).sum::<u32>() + (a.len() as i64 - b.len() as i64).unsigned_abs() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rs::FieldParams;

    #[test]
    fn encode_decode_round_trip_via_manager() {
        let codec = RsCodec::new(10, FieldParams::default()).unwrap();
        let ecm = EccManager::new(&codec);
        let message = b"abc";
        let ecc = ecm.encode(message, 5).unwrap();
        assert!(ecm.check(message, &ecc, 5));
    }

    #[test]
    fn shortening_is_transparent() {
        let codec = RsCodec::new(10, FieldParams::default()).unwrap();
        let ecm = EccManager::new(&codec);
        let message = b"hi"; // shorter than k=5
        let ecc = ecm.encode(message, 5).unwrap();
        let (recovered, _) = ecm.decode(message, &ecc, 5, false, 0, false).unwrap();
        assert_eq!(recovered, message);
    }

    #[test]
    fn over_length_message_errors_instead_of_panicking() {
        let codec = RsCodec::new(10, FieldParams::default()).unwrap();
        let ecm = EccManager::new(&codec);
        let message = b"way too long for k=5"; // 20 bytes > k
        let err = ecm.encode(message, 5).unwrap_err();
        assert_eq!(err, ParameterError::MessageTooLong { len: 20, k: 5 });
        assert!(!ecm.check(message, &[0u8; 5], 5));
    }

    #[test]
    fn puncturing_tolerates_truncated_ecc() {
        let codec = RsCodec::new(10, FieldParams::default()).unwrap();
        let ecm = EccManager::new(&codec);
        let message = b"abcde";
        let mut ecc = ecm.encode(message, 5).unwrap();
        ecc.truncate(ecc.len() - 1); // lose one ecc byte (puncture)
        let (recovered, _) = ecm.decode(message, &ecc, 5, true, 0, true).unwrap();
        assert_eq!(recovered, message);
    }
}
