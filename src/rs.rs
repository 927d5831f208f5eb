//! Reed-Solomon codec over GF(2^8): systematic encoder, errors-and-erasures
//! decoder (Berlekamp-Massey + Chien search + Forney), and a fast path that
//! must agree with the reference decoder bit-for-bit.
//!
//! A codec instance owns one field (`Gf`) and one `n`; generator polynomials
//! for each `k` it has been asked to encode/decode at are cached, since the
//! sidecar engine repeatedly re-derives the same handful of region rates.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ParameterError, RsError};
use crate::gf::Gf;
use crate::poly::Poly;

/// Field parameters shared by a codec. `fcr` is the first consecutive root
/// used by the generator polynomial and syndrome computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldParams {
    pub prim: u16,
    pub generator: u8,
    pub fcr: u8,
}

impl Default for FieldParams {
    fn default() -> Self {
        FieldParams {
            prim: crate::gf::DEFAULT_PRIM,
            generator: crate::gf::DEFAULT_GENERATOR,
            fcr: crate::gf::DEFAULT_FCR,
        }
    }
}

/// A Reed-Solomon codec for a fixed codeword length `n` under one field.
/// `k` (message length) varies per call, so long as `1 <= k < n <= 255`.
///
/// The generator-polynomial cache is a `Mutex` rather than a `RefCell` so a
/// codec can be shared across threads (the `parallel` feature's per-block
/// fan-out encodes/decodes many blocks against the same `&RsCodec`).
pub struct RsCodec {
    gf: Gf,
    n: usize,
    fcr: u8,
    generator_polys: Mutex<HashMap<usize, Poly>>,
}

impl RsCodec {
    pub fn new(n: usize, params: FieldParams) -> Result<Self, ParameterError> {
        if n == 0 || n > 255 {
            return Err(ParameterError::InvalidBlockSizes { n, k: 0 });
        }
        Ok(RsCodec {
            gf: Gf::new(params.prim, params.generator),
            n,
            fcr: params.fcr,
            generator_polys: Mutex::new(HashMap::new()),
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn field(&self) -> &Gf {
        &self.gf
    }

    fn check_k(&self, k: usize) -> Result<(), ParameterError> {
        if k == 0 || k >= self.n {
            Err(ParameterError::InvalidBlockSizes { n: self.n, k })
        } else {
            Ok(())
        }
    }

    /// `g(x) = prod_{i=0}^{n-k-1} (x - alpha^(fcr+i))`, monic, descending
    /// (coeffs[0] is the x^(n-k) leading 1). Cached per `k`.
    fn generator_poly(&self, k: usize) -> Poly {
        if let Some(p) = self.generator_polys.lock().unwrap().get(&k) {
            return p.clone();
        }
        let nsym = self.n - k;
        let mut g = Poly::one();
        for i in 0..nsym {
            let root = self.gf.alpha_pow(self.fcr as i32 + i as i32);
            let factor = Poly::new(vec![1, root]);
            g = g.mul(&self.gf, &factor);
        }
        self.generator_polys.lock().unwrap().insert(k, g.clone());
        g
    }

    /// Encode `message` (length <= k) into a full `n`-byte systematic
    /// codeword: the (left-padded) message followed by `n - k` ECC bytes.
    pub fn encode(&self, message: &[u8], k: usize) -> Result<Vec<u8>, ParameterError> {
        self.check_k(k)?;
        if message.len() > k {
            return Err(ParameterError::InvalidBlockSizes { n: self.n, k });
        }
        let nsym = self.n - k;
        let mut padded = vec![0u8; k - message.len()];
        padded.extend_from_slice(message);

        let mut shifted = padded.clone();
        shifted.extend(std::iter::repeat(0u8).take(nsym));
        let shifted_poly = Poly::new_untrimmed(shifted);
        let g = self.generator_poly(k);
        let (_, remainder) = shifted_poly.synthetic_divmod_monic(&self.gf, &g);

        let mut ecc = vec![0u8; nsym];
        let rem = remainder.coeffs();
        let off = nsym - rem.len().min(nsym);
        ecc[off..].copy_from_slice(&rem[rem.len().saturating_sub(nsym)..]);

        let mut codeword = padded;
        codeword.extend_from_slice(&ecc);
        Ok(codeword)
    }

    /// Reference (non-fast) errors-and-erasures decoder. See module docs for
    /// the step-by-step algorithm.
    pub fn decode(
        &self,
        received: &[u8],
        k: usize,
        erasures: &[usize],
        only_erasures: bool,
    ) -> Result<Vec<u8>, RsError> {
        self.decode_inner(received, k, erasures, only_erasures, false)
    }

    /// Fast path: identical result to [`RsCodec::decode`], using `mul_at` to
    /// avoid materializing full products during the Berlekamp-Massey
    /// discrepancy computation.
    pub fn decode_fast(
        &self,
        received: &[u8],
        k: usize,
        erasures: &[usize],
        only_erasures: bool,
    ) -> Result<Vec<u8>, RsError> {
        self.decode_inner(received, k, erasures, only_erasures, true)
    }

    /// `true` iff the received word's syndromes are all zero (already a
    /// valid codeword, nothing to correct).
    pub fn check(&self, received: &[u8], k: usize) -> bool {
        if received.len() != self.n || k >= self.n {
            return false;
        }
        let nsym_total = self.n - k;
        let synd = self.syndromes(received, nsym_total);
        synd[..nsym_total].iter().all(|&s| s == 0)
    }

    fn syndromes(&self, received: &[u8], nsym: usize) -> Vec<u8> {
        let r_poly = Poly::new_untrimmed(received.to_vec());
        let mut synd = vec![0u8; nsym + 1];
        for l in 0..nsym {
            let x = self.gf.alpha_pow(self.fcr as i32 + l as i32);
            synd[l] = r_poly.eval(&self.gf, x);
        }
        // synd[nsym] stays 0: the trailing coefficient from step 1.
        synd
    }

    fn decode_inner(
        &self,
        received: &[u8],
        k: usize,
        erasures: &[usize],
        only_erasures: bool,
        fast: bool,
    ) -> Result<Vec<u8>, RsError> {
        if received.len() != self.n {
            return Err(RsError::WrongLength { expected: self.n, got: received.len() });
        }
        let nsym = self.n - k;
        if erasures.len() > nsym {
            // Erasures alone exceed the correction bound: pass through.
            return Ok(received.to_vec());
        }

        let synd = self.syndromes(received, nsym); // length nsym+1, ascending S_0..S_{nsym-1},0
        if synd[..nsym].iter().all(|&s| s == 0) {
            return Ok(received.to_vec());
        }

        // Erasure coefficient (exponent) positions: string position i -> n-1-i.
        let erasure_exponents: Vec<usize> = erasures.iter().map(|&i| self.n - 1 - i).collect();

        // Lambda_e(x) = prod (1 - x*alpha^i), ascending.
        let mut lambda_e = vec![1u8];
        for &e in &erasure_exponents {
            let root = self.gf.alpha_pow(e as i32);
            lambda_e = ascending_mul(&self.gf, &lambda_e, &[1, root]);
        }
        let v = erasure_exponents.len();

        if only_erasures {
            let sigma_desc = ascending_to_descending(&lambda_e);
            return self.finish_correction(received, &synd, nsym, &sigma_desc, fast);
        }

        // Berlekamp-Massey seeded with the erasure locator.
        let (lambda, omega) = self.berlekamp_massey(&synd, nsym, &lambda_e, v, fast);

        let sigma_desc = ascending_to_descending(&lambda);
        let deg_sigma = sigma_desc.degree();
        if deg_sigma > nsym {
            return Err(RsError::TooManyErrors);
        }

        // Step 5: evaluator correction, omega = (S * sigma) mod x^{nsym+1},
        // truncated to degree < deg_sigma.
        let s_poly = Poly::new_untrimmed(synd.clone());
        let lambda_poly_asc = Poly::new_untrimmed(lambda.clone());
        let full_omega = ascending_mul_trunc(&self.gf, s_poly.coeffs(), lambda_poly_asc.coeffs(), nsym + 1);
        let truncated_omega: Vec<u8> = full_omega.into_iter().take(deg_sigma.max(1)).collect();
        let _ = omega; // BM's own running omega is superseded by this recompute (§4.3 step 5).
        let omega_desc = ascending_to_descending(&truncated_omega);

        self.finish_correction_with_omega(received, nsym, &sigma_desc, &omega_desc, fast)
    }

    fn finish_correction(
        &self,
        received: &[u8],
        synd: &[u8],
        nsym: usize,
        sigma_desc: &Poly,
        fast: bool,
    ) -> Result<Vec<u8>, RsError> {
        let s_poly = Poly::new_untrimmed(synd.to_vec());
        let deg_sigma = sigma_desc.degree();
        let omega_asc = ascending_mul_trunc(&self.gf, s_poly.coeffs(), &to_ascending(sigma_desc), nsym + 1);
        let omega_trunc: Vec<u8> = omega_asc.into_iter().take(deg_sigma.max(1)).collect();
        let omega_desc = ascending_to_descending(&omega_trunc);
        self.finish_correction_with_omega(received, nsym, sigma_desc, &omega_desc, fast)
    }

    fn finish_correction_with_omega(
        &self,
        received: &[u8],
        nsym: usize,
        sigma: &Poly,
        omega: &Poly,
        _fast: bool,
    ) -> Result<Vec<u8>, RsError> {
        let deg_sigma = sigma.degree();
        // Chien search: l in [0, n), root at sigma(alpha^-l) == 0.
        let mut positions = Vec::new(); // array indices (n-1-l)
        let mut locations = Vec::new(); // alpha^l
        for l in 0..self.n {
            let x_inv = self.gf.alpha_pow(-(l as i32));
            if sigma.eval(&self.gf, x_inv) == 0 {
                positions.push(self.n - 1 - l);
                locations.push(self.gf.alpha_pow(l as i32));
            }
        }
        if positions.len() != deg_sigma {
            return Err(RsError::TooManyErrors);
        }
        if positions.len() > nsym {
            return Err(RsError::TooManyErrors);
        }

        let sigma_prime = sigma.derivative();
        let mut corrected = received.to_vec();
        for (pos, &xl) in positions.iter().zip(locations.iter()) {
            let xl_inv = self.gf.inverse(xl);
            let xl_pow = self.gf.pow(xl, 1 - self.fcr as i32);
            let omega_val = omega.eval(&self.gf, xl_inv);
            let sigma_prime_val = sigma_prime.eval(&self.gf, xl_inv);
            if sigma_prime_val == 0 {
                return Err(RsError::TooManyErrors);
            }
            let y = self
                .gf
                .div(self.gf.mul(xl_pow, omega_val), sigma_prime_val)
                .map_err(|_| RsError::TooManyErrors)?;
            // Negation is identity in GF(2^k): Y_l as computed is the magnitude to XOR in.
            corrected[*pos] = Gf::add(corrected[*pos], y);
        }

        // Failsafe (step 8): a corrected word longer than the input would
        // indicate a representation bug; our arrays are fixed-length so this
        // can't occur, kept here only as a documented invariant check.
        debug_assert_eq!(corrected.len(), received.len());

        let post_synd = self.syndromes(&corrected, nsym);
        if post_synd[..nsym].iter().any(|&s| s != 0) {
            return Err(RsError::NotACodeword);
        }
        Ok(corrected)
    }

    /// Erasure-seeded Berlekamp-Massey. Returns final `(Lambda, Omega)` as
    /// ascending coefficient vectors. `fast` selects the `mul_at`-based
    /// discrepancy computation; both paths must agree bit-for-bit.
    fn berlekamp_massey(
        &self,
        synd: &[u8],
        nsym: usize,
        lambda_e: &[u8],
        v: usize,
        fast: bool,
    ) -> (Vec<u8>, Vec<u8>) {
        let gf = &self.gf;
        let mut lambda = lambda_e.to_vec();
        let mut b = lambda_e.to_vec();
        let s_full = synd.to_vec();
        // Omega_e(x) = (S(x)*Lambda_e(x)) mod x^{nsym+1}
        let mut omega = ascending_mul_trunc(gf, &s_full, lambda_e, nsym + 1);
        let mut a = omega.clone();

        let mut l = v;
        let mut prev_discrepancy = 1u8;
        let mut shift = 1usize;

        for r in v..nsym {
            let delta = if fast {
                discrepancy_fast(gf, &lambda, &s_full, r)
            } else {
                discrepancy_slow(gf, &lambda, &s_full, r)
            };

            if delta == 0 {
                shift += 1;
            } else if 2 * l <= r {
                let t_lambda = lambda.clone();
                let t_omega = omega.clone();
                let coef = gf.div(delta, prev_discrepancy).unwrap_or(0);
                lambda = ascending_add(&lambda, &ascending_scale(gf, &ascending_shift(&b, shift), coef));
                omega = ascending_add(&omega, &ascending_scale(gf, &ascending_shift(&a, shift), coef));
                l = r + 1 - l;
                b = t_lambda;
                a = t_omega;
                prev_discrepancy = delta;
                shift = 1;
            } else {
                let coef = gf.div(delta, prev_discrepancy).unwrap_or(0);
                lambda = ascending_add(&lambda, &ascending_scale(gf, &ascending_shift(&b, shift), coef));
                omega = ascending_add(&omega, &ascending_scale(gf, &ascending_shift(&a, shift), coef));
                shift += 1;
            }
        }
        (lambda, omega)
    }
}

fn to_ascending(p: &Poly) -> Vec<u8> {
    p.coeffs().iter().rev().cloned().collect()
}

fn ascending_to_descending(asc: &[u8]) -> Poly {
    Poly::new(asc.iter().rev().cloned().collect())
}

fn ascending_add(a: &[u8], b: &[u8]) -> Vec<u8> {
    let len = a.len().max(b.len());
    let mut out = vec![0u8; len];
    for (i, &c) in a.iter().enumerate() {
        out[i] ^= c;
    }
    for (i, &c) in b.iter().enumerate() {
        out[i] ^= c;
    }
    out
}

fn ascending_scale(gf: &Gf, a: &[u8], scalar: u8) -> Vec<u8> {
    a.iter().map(|&c| gf.mul(c, scalar)).collect()
}

/// Multiply by `x^shift`: prepend `shift` zero (low-order) coefficients.
fn ascending_shift(a: &[u8], shift: usize) -> Vec<u8> {
    let mut out = vec![0u8; shift];
    out.extend_from_slice(a);
    out
}

fn ascending_mul(gf: &Gf, a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            if bj == 0 {
                continue;
            }
            out[i + j] ^= gf.mul(ai, bj);
        }
    }
    out
}

fn ascending_mul_trunc(gf: &Gf, a: &[u8], b: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0 || i >= len {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            if bj == 0 {
                continue;
            }
            let idx = i + j;
            if idx < len {
                out[idx] ^= gf.mul(ai, bj);
            }
        }
    }
    out
}

/// Discrepancy `delta_r = [x^r] (Lambda(x) * S(x))`, full convolution.
fn discrepancy_slow(gf: &Gf, lambda: &[u8], synd: &[u8], r: usize) -> u8 {
    let lam = Poly::new_untrimmed(lambda.to_vec());
    let s = Poly::new_untrimmed(synd.to_vec());
    lam.mul(gf, &s).coeffs().get(r).copied().unwrap_or_else(|| {
        // full product is shorter than r+1 only if both inputs are trivially
        // short; mul_at-based path below handles this uniformly.
        0
    })
}

/// Same quantity as [`discrepancy_slow`], computed via `Poly::mul_at`
/// without materializing the full convolution.
fn discrepancy_fast(gf: &Gf, lambda: &[u8], synd: &[u8], r: usize) -> u8 {
    let lam = Poly::new_untrimmed(lambda.to_vec());
    let s = Poly::new_untrimmed(synd.to_vec());
    lam.mul_at(gf, &s, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_codec(n: usize) -> RsCodec {
        RsCodec::new(n, FieldParams::default()).unwrap()
    }

    #[test]
    fn scenario_a_rs_5_2_sanity() {
        let codec = standard_codec(5);
        let codeword = codec.encode(&[140, 128], 2).unwrap();
        assert_eq!(codeword, vec![140, 128, 182, 242, 0]);
    }

    #[test]
    fn encoder_is_systematic() {
        let codec = standard_codec(20);
        let msg: Vec<u8> = (0..15u8).collect();
        let codeword = codec.encode(&msg, 15).unwrap();
        assert_eq!(&codeword[..15], &msg[..]);
    }

    #[test]
    fn round_trip_no_damage() {
        let codec = standard_codec(20);
        let msg: Vec<u8> = (0..15u8).map(|x| x * 7 + 3).collect();
        let codeword = codec.encode(&msg, 15).unwrap();
        let decoded = codec.decode(&codeword, 15, &[], false).unwrap();
        assert_eq!(&decoded[..15], &msg[..]);
    }

    #[test]
    fn single_byte_error_corrects() {
        let codec = standard_codec(255);
        let msg = b"Hello, world! This is a long string".to_vec();
        let codeword = codec.encode(&msg, 223).unwrap();
        for i in 0..codeword.len() {
            let mut corrupted = codeword.clone();
            corrupted[i] = corrupted[i].wrapping_add(50);
            let decoded = codec.decode(&corrupted, 223, &[], false).unwrap();
            assert_eq!(&decoded[..msg.len()], &msg[..], "position {i}");
        }
    }

    #[test]
    fn sixteen_byte_errors_scenario_c() {
        let codec = standard_codec(255);
        let msg = b"Hello, world! This is a long string".to_vec();
        let codeword = codec.encode(&msg, 223).unwrap();
        let positions = [5, 6, 12, 13, 38, 40, 42, 47, 50, 57, 58, 59, 60, 61, 62, 65];
        let mut corrupted = codeword.clone();
        for &p in &positions {
            corrupted[p] = corrupted[p].wrapping_add(50);
        }
        let decoded = codec.decode(&corrupted, 223, &[], false).unwrap();
        assert_eq!(&decoded[..msg.len()], &msg[..]);
    }

    #[test]
    fn seventeen_byte_errors_scenario_d_fails() {
        let codec = standard_codec(255);
        let msg = b"Hello, world! This is a long string".to_vec();
        let codeword = codec.encode(&msg, 223).unwrap();
        let positions = [5, 6, 12, 13, 38, 40, 42, 47, 50, 57, 58, 59, 60, 61, 62, 65, 70];
        let mut corrupted = codeword.clone();
        for &p in &positions {
            corrupted[p] = corrupted[p].wrapping_add(50);
        }
        let result = codec.decode(&corrupted, 223, &[], false);
        assert!(matches!(result, Err(RsError::TooManyErrors) | Err(RsError::NotACodeword)));
    }

    #[test]
    fn decode_fast_matches_decode() {
        let codec = standard_codec(40);
        let msg: Vec<u8> = (0..30u8).map(|x| x.wrapping_mul(31)).collect();
        let codeword = codec.encode(&msg, 30).unwrap();
        let mut corrupted = codeword.clone();
        corrupted[3] ^= 0xFF;
        corrupted[10] ^= 0x0A;
        let slow = codec.decode(&corrupted, 30, &[], false);
        let fast = codec.decode_fast(&corrupted, 30, &[], false);
        assert_eq!(slow, fast);
    }

    #[test]
    fn erasures_only_within_bound() {
        let codec = standard_codec(20);
        let msg: Vec<u8> = (0..15u8).collect();
        let codeword = codec.encode(&msg, 15).unwrap();
        let mut corrupted = codeword.clone();
        for &p in &[15, 16, 17, 18, 19] {
            corrupted[p] = 0;
        }
        let decoded = codec.decode(&corrupted, 15, &[15, 16, 17, 18, 19], true).unwrap();
        assert_eq!(decoded, codeword);
    }

    /// Scenario E: BM seeded with an erasure locator, `only_erasures = false`
    /// so the full discrepancy loop runs instead of the `finish_correction`
    /// shortcut. `sigma` is the raw ascending Lambda straight out of BM,
    /// matching the documented erasure-locator product for these 4 erased
    /// positions.
    #[test]
    fn scenario_e_bm_with_pure_erasures() {
        let codec = standard_codec(22);
        let msg = b"hello world".to_vec();
        let codeword = codec.encode(&msg, 11).unwrap();
        let mut corrupted = codeword.clone();
        for &p in &[0, 1, 2, 3] {
            corrupted[p] = 0;
        }
        let erasures = [0usize, 1, 2, 3];
        let nsym = 11;
        let synd = codec.syndromes(&corrupted, nsym);
        let erasure_exponents: Vec<usize> = erasures.iter().map(|&i| codec.n - 1 - i).collect();
        let mut lambda_e = vec![1u8];
        for &e in &erasure_exponents {
            let root = codec.gf.alpha_pow(e as i32);
            lambda_e = ascending_mul(&codec.gf, &lambda_e, &[1, root]);
        }
        let v = erasure_exponents.len();
        let (sigma, _omega) = codec.berlekamp_massey(&synd, nsym, &lambda_e, v, false);
        assert_eq!(sigma, vec![120, 210, 102, 219, 1]);

        let decoded = codec.decode(&corrupted, 11, &erasures, false).unwrap();
        assert_eq!(decoded, codeword);
    }

    #[test]
    fn mixed_erasures_and_errors_decode() {
        let codec = standard_codec(22);
        let msg = b"hello world".to_vec();
        let codeword = codec.encode(&msg, 11).unwrap();
        let mut corrupted = codeword.clone();
        // Known erasures (cleared, positions supplied to the decoder).
        for &p in &[0, 1] {
            corrupted[p] = 0;
        }
        // Unrelated, unknown byte errors elsewhere in the codeword.
        corrupted[15] ^= 0xFF;
        corrupted[18] = corrupted[18].wrapping_add(7);

        let decoded = codec.decode(&corrupted, 11, &[0, 1], false).unwrap();
        assert_eq!(&decoded[..msg.len()], &msg[..]);
    }
}
