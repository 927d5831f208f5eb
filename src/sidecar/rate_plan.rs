//! Region rate plan: maps a file's byte ranges to resilience rates, and the
//! pull-style `BlockProducer` that walks those ranges in fixed-`k` chunks.
//!
//! Replaces the donor ecosystem's generator-based (`yield`) streaming with
//! a pull iterator, matching the rest of this crate's `Read`-driven style.

use crate::error::ParameterError;

/// Per-file byte-range -> resilience-rate map. `header_size` bytes at the
/// front get `rates[0]`; the remaining body is split evenly in two, with
/// `rates[1]` covering the first half and `rates[2]` the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRatePlan {
    pub header_size: u64,
    pub rates: [f64; 3],
}

impl RegionRatePlan {
    pub fn new(header_size: u64, rates: [f64; 3]) -> Result<Self, ParameterError> {
        for &r in &rates {
            if !(r > 0.0 && r <= 1.0) {
                return Err(ParameterError::InvalidRate(r));
            }
        }
        Ok(RegionRatePlan { header_size, rates })
    }

    /// `k = round(n / (1 + 2r))`, the per-region message size for codeword
    /// length `n`.
    pub fn k_for_rate(n: usize, rate: f64) -> usize {
        let k = (n as f64 / (1.0 + 2.0 * rate)).round() as i64;
        k.clamp(1, n as i64 - 1) as usize
    }

    /// The three `(start, end)` byte ranges for a file of `filesize` bytes.
    /// Ranges past EOF collapse to empty (`start == end`).
    pub fn regions(&self, filesize: u64) -> [(u64, u64); 3] {
        let header_end = self.header_size.min(filesize);
        let body_len = filesize.saturating_sub(header_end);
        let stage1_len = body_len / 2;
        let stage1_end = header_end + stage1_len;
        [(0, header_end), (header_end, stage1_end), (stage1_end, filesize)]
    }

    /// One block descriptor: its absolute file offset, the region index
    /// (0/1/2) it belongs to, the region's nominal `k`, and how many bytes
    /// of real file data it covers (`<= k`, shorter only for the last block
    /// of a region).
    pub fn block_plan(&self, n: usize, filesize: u64) -> Vec<BlockSpec> {
        let regions = self.regions(filesize);
        let mut out = Vec::new();
        for (region_idx, &(start, end)) in regions.iter().enumerate() {
            if start >= end {
                continue;
            }
            let k = Self::k_for_rate(n, self.rates[region_idx]);
            let mut offset = start;
            while offset < end {
                let remaining = end - offset;
                let len = remaining.min(k as u64) as usize;
                out.push(BlockSpec { offset, len, k, region: region_idx });
                offset += len as u64;
            }
        }
        out
    }
}

impl Default for RegionRatePlan {
    fn default() -> Self {
        RegionRatePlan { header_size: 512, rates: [0.5, 0.2, 0.1] }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    pub offset: u64,
    pub len: usize,
    pub k: usize,
    pub region: usize,
}

/// Pull-style iterator producing `(offset, block_bytes, k_for_this_block)`
/// tuples from a `Read`-er, given a precomputed block plan. Consumers match
/// each yielded block against the corresponding entry in the ECC stream.
pub struct BlockProducer<'a, R: std::io::Read> {
    reader: &'a mut R,
    plan: std::vec::IntoIter<BlockSpec>,
}

impl<'a, R: std::io::Read> BlockProducer<'a, R> {
    pub fn new(reader: &'a mut R, plan: Vec<BlockSpec>) -> Self {
        BlockProducer { reader, plan: plan.into_iter() }
    }
}

impl<'a, R: std::io::Read> Iterator for BlockProducer<'a, R> {
    type Item = std::io::Result<(BlockSpec, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let spec = self.plan.next()?;
        let mut buf = vec![0u8; spec.len];
        if let Err(e) = self.reader.read_exact(&mut buf) {
            return Some(Err(e));
        }
        Some(Ok((spec, buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_for_rate_matches_formula() {
        assert_eq!(RegionRatePlan::k_for_rate(255, 1.0), 85);
        assert_eq!(RegionRatePlan::k_for_rate(5, 1.0), 2);
    }

    #[test]
    fn regions_split_body_in_half() {
        let plan = RegionRatePlan::new(10, [0.5, 0.2, 0.1]).unwrap();
        let regions = plan.regions(110);
        assert_eq!(regions[0], (0, 10));
        assert_eq!(regions[1], (10, 60));
        assert_eq!(regions[2], (60, 110));
    }

    #[test]
    fn block_plan_shortens_last_block() {
        let plan = RegionRatePlan::new(0, [0.5, 0.5, 0.5]).unwrap();
        let specs = plan.block_plan(10, 7);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].len, 7);
    }

    #[test]
    fn small_file_collapses_empty_regions() {
        let plan = RegionRatePlan::new(100, [0.5, 0.5, 0.5]).unwrap();
        let specs = plan.block_plan(10, 5);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].region, 0);
    }
}
