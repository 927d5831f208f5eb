//! Error taxonomy for the fixity engine.
//!
//! Mirrors the donor crate's `ReadWriteError`: hand-written `Display`/`Error`
//! impls and `From<std::io::Error>` conversions rather than a derive macro.

use std::fmt;

/// Field-parameter or rate/size misconfiguration. Fatal, surfaced at setup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// `k` was zero, or `k >= n`, or `n > 255`.
    InvalidBlockSizes { n: usize, k: usize },
    /// A resilience rate was outside `(0, 1]`.
    InvalidRate(f64),
    /// No primitive polynomial of degree 8 satisfies the requested `(generator, fcr)`.
    NoPrimitivePolynomial { generator: u8 },
    /// A message handed to shortening (`EccManager::encode`) was longer
    /// than the block's `k`, so it can't be left-padded to fit -- the
    /// caller's data exceeds this block's capacity rather than being a
    /// codec misconfiguration.
    MessageTooLong { len: usize, k: usize },
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::InvalidBlockSizes { n, k } => {
                write!(f, "invalid RS block sizes: n={n}, k={k} (require 1 <= k < n <= 255)")
            }
            ParameterError::InvalidRate(r) => write!(f, "resilience rate {r} is not in (0, 1]"),
            ParameterError::NoPrimitivePolynomial { generator } => write!(
                f,
                "no degree-8 primitive polynomial found for generator {generator}"
            ),
            ParameterError::MessageTooLong { len, k } => {
                write!(f, "message of {len} bytes exceeds this block's capacity (k={k})")
            }
        }
    }
}

impl std::error::Error for ParameterError {}

/// Errors raised by the Galois-field layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfError {
    /// Attempted to divide by the zero element.
    DivByZero,
}

impl fmt::Display for GfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfError::DivByZero => write!(f, "division by zero in GF(2^8)"),
        }
    }
}

impl std::error::Error for GfError {}

/// Errors raised by the Reed-Solomon decoder, per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsError {
    /// The number of errata exceeded the code's correction bound; the block
    /// could not be corrected and was left untouched by the caller.
    TooManyErrors,
    /// Decoding completed but the result still fails the syndrome check.
    NotACodeword,
    /// Received word length did not match the codec's `n`.
    WrongLength { expected: usize, got: usize },
    /// The message or ECC handed in couldn't be padded to fit this block
    /// (e.g. a message longer than `k`).
    Parameter(ParameterError),
}

impl From<ParameterError> for RsError {
    fn from(e: ParameterError) -> Self {
        RsError::Parameter(e)
    }
}

impl fmt::Display for RsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsError::TooManyErrors => write!(f, "too many errors/erasures to correct"),
            RsError::NotACodeword => write!(f, "decoded word is not a valid codeword"),
            RsError::WrongLength { expected, got } => {
                write!(f, "received word has length {got}, expected {expected}")
            }
            RsError::Parameter(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RsError::Parameter(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors surfaced by the sidecar engine. I/O errors carry the originating
/// path so failures are reportable without the caller re-threading context.
#[derive(Debug)]
pub enum SidecarError {
    Io(std::io::Error),
    /// A structural element (header, first entry marker, index file) was
    /// expected and missing. Fatal: aborts the current operation.
    MissingStructure(String),
    Parameter(ParameterError),
}

impl fmt::Display for SidecarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SidecarError::Io(e) => write!(f, "io error: {e}"),
            SidecarError::MissingStructure(s) => write!(f, "missing structure: {s}"),
            SidecarError::Parameter(e) => write!(f, "parameter error: {e}"),
        }
    }
}

impl std::error::Error for SidecarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SidecarError::Io(e) => Some(e),
            SidecarError::MissingStructure(_) => None,
            SidecarError::Parameter(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SidecarError {
    fn from(e: std::io::Error) -> Self {
        SidecarError::Io(e)
    }
}

impl From<ParameterError> for SidecarError {
    fn from(e: ParameterError) -> Self {
        SidecarError::Parameter(e)
    }
}

/// Outcome of decoding one block: a block never propagates `RsError` out of
/// the sidecar's per-block loop, per the propagation policy (a partial
/// recovery beats an aborted pass). Instead the loop records one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Hash matched on first read; no ECC work needed.
    Good,
    /// Hash mismatched but ECC decode + re-hash succeeded.
    Corrected,
    /// ECC decode failed outright (`RsError::TooManyErrors`).
    Unrecoverable(RsError),
    /// ECC decode "succeeded" but the repaired bytes still don't hash right.
    NotACodeword,
}
