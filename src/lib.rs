//! A file-fixity preservation engine: per-file Reed-Solomon error correction
//! plus a self-healing sidecar container that can recover both the
//! archived files and its own framing after damage.
//!
//! The crate is organized bottom-up:
//!
//! - [`gf`]: GF(2^8) arithmetic (the field every other layer is built on).
//! - [`poly`]: dense polynomials over that field.
//! - [`rs`]: the Reed-Solomon codec itself (encode, and an errors-and-
//!   erasures decoder with a reference and a fast path).
//! - [`ecm`]: a facade over [`rs::RsCodec`] handling message shortening and
//!   ECC puncturing, plus field-parameter recovery.
//! - [`hasher`]: pluggable per-block digest production.
//! - [`sidecar`]: the archival format itself -- generate, check/repair, and
//!   the framing-recovery strategies.
//!
//! Directory traversal, CLI argument parsing, and exit-code handling are
//! external collaborators; this crate hands back typed reports
//! ([`sidecar::VerificationReport`]) instead of touching the process.

pub mod ecm;
pub mod error;
pub mod gf;
pub mod hasher;
pub mod poly;
pub mod rs;
pub mod sidecar;
