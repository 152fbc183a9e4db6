use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use genome::{PileAllele, Phred, Position};
use rust_htslib::bam::record::{Cigar, Record};

/// Stable identity of a read, shared across BAMs so that read-id sets from
/// the child and parent pileups compose by set algebra (see `DESIGN.md`,
/// "Read identity across BAMs").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadId(u64);

impl ReadId {
    pub fn new(read_name: &[u8], first_in_pair: bool, alignment_start: i64) -> Self {
        let mut hasher = DefaultHasher::new();
        read_name.hash(&mut hasher);
        first_in_pair.hash(&mut hasher);
        alignment_start.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// The facts the Pileup Builder needs about one read overlapping a position,
/// decoupled from `rust_htslib` so the builder can be exercised with
/// hand-built fixtures (see `SPEC_FULL.md` §3, "ReadObservation").
#[derive(Debug, Clone, PartialEq)]
pub struct ReadObservation {
    pub read_id: ReadId,
    pub allele: PileAllele,
    pub base_quality: Phred,
    pub mapping_quality: Phred,
    pub clipped: bool,
    pub apparent_mismap: bool,
    pub mate_unmapped: bool,
    pub end_position: bool,
}

impl ReadObservation {
    /// `accuracy(base_quality) * accuracy(mapping_quality)`, the per-read
    /// weight contributed to `weighted_depth` when the read is not clipped,
    /// not an apparent mismap, and its mate is mapped.
    pub fn weight(&self) -> f64 {
        self.base_quality.accuracy() * self.mapping_quality.accuracy()
    }

    pub fn counts_toward_weighted_depth(&self) -> bool {
        !self.clipped && !self.apparent_mismap && !self.mate_unmapped
    }
}

/// Sum of query-consuming CIGAR op lengths, i.e. the read length as aligned.
fn query_consumed_length(cigar: &[Cigar]) -> u32 {
    cigar
        .iter()
        .map(|op| match op {
            Cigar::Match(n) | Cigar::Ins(n) | Cigar::SoftClip(n) | Cigar::Equal(n) | Cigar::Diff(n) => *n,
            Cigar::Del(_) | Cigar::RefSkip(_) | Cigar::HardClip(_) | Cigar::Pad(_) => 0,
        })
        .sum()
}

fn equals_length(cigar: &[Cigar]) -> u32 {
    cigar
        .iter()
        .map(|op| match op {
            Cigar::Equal(n) => *n,
            _ => 0,
        })
        .sum()
}

fn has_clip(cigar: &[Cigar]) -> bool {
    cigar
        .iter()
        .any(|op| matches!(op, Cigar::SoftClip(_) | Cigar::HardClip(_)))
}

/// Walk the CIGAR to find the read (query) offset covering 0-based reference
/// position `ref_pos`, or `None` if the alignment does not cover it (a
/// deletion/ref-skip at that position, or the position lies outside the
/// aligned footprint).
fn query_offset_at(cigar: &[Cigar], alignment_start: i64, ref_pos: i64) -> Option<usize> {
    let mut ref_cursor = alignment_start;
    let mut query_cursor: usize = 0;
    for op in cigar {
        let (consumes_ref, consumes_query, len) = match *op {
            Cigar::Match(n) | Cigar::Equal(n) | Cigar::Diff(n) => (true, true, n),
            Cigar::Ins(n) | Cigar::SoftClip(n) => (false, true, n),
            Cigar::Del(n) | Cigar::RefSkip(n) => (true, false, n),
            Cigar::HardClip(_) | Cigar::Pad(_) => (false, false, 0),
        };
        let len = len as i64;
        if consumes_ref && ref_pos >= ref_cursor && ref_pos < ref_cursor + len {
            if !consumes_query {
                return None;
            }
            let delta = (ref_pos - ref_cursor) as usize;
            return Some(query_cursor + delta);
        }
        if consumes_ref {
            ref_cursor += len;
        }
        if consumes_query {
            query_cursor += len as usize;
        }
    }
    None
}

/// Translate a `rust_htslib` alignment record into a [`ReadObservation`] at
/// 0-based reference position `ref_pos`. Returns `None` for duplicate reads
/// or reads that don't cover the position (the caller skips them, as the
/// builder never sees uncovered reads at all).
pub fn extract_observation(record: &Record, ref_pos: i64) -> Option<ReadObservation> {
    if record.is_duplicate() {
        return None;
    }
    let cigar = record.cigar();
    let ops: Vec<Cigar> = cigar.iter().copied().collect();
    let alignment_start = record.pos();
    let offset = query_offset_at(&ops, alignment_start, ref_pos)?;

    let seq = record.seq();
    let base = seq[offset];
    let allele = PileAllele::from(genome::Base::try_from(base).unwrap_or(genome::Base::N));

    let base_quality = Phred::new(record.qual()[offset]);
    let mapping_quality = Phred::new(record.mapq());

    let read_len = query_consumed_length(&ops).max(1);
    let apparent_mismap = (equals_length(&ops) as f64 / read_len as f64) < 0.5;
    let clipped = has_clip(&ops);
    let mate_unmapped = record.is_paired() && record.is_mate_unmapped();

    let alignment_end = cigar.end_pos() - 1;
    let end_position = ref_pos == alignment_start || ref_pos == alignment_end;

    let read_id = ReadId::new(record.qname(), record.is_first_in_template(), alignment_start);

    Some(ReadObservation {
        read_id,
        allele,
        base_quality,
        mapping_quality,
        clipped,
        apparent_mismap,
        mate_unmapped,
        end_position,
    })
}

/// Reference position as an `i64` usable with `rust_htslib`'s 0-based APIs.
pub fn to_zero_based(pos: Position) -> i64 {
    i64::from(u32::from(pos)) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_offset_skips_deletions() {
        let cigar = vec![Cigar::Match(5), Cigar::Del(2), Cigar::Match(5)];
        assert_eq!(query_offset_at(&cigar, 100, 102), Some(2));
        assert_eq!(query_offset_at(&cigar, 100, 105), None);
        assert_eq!(query_offset_at(&cigar, 100, 107), Some(5));
    }

    #[test]
    fn query_offset_handles_soft_clip_prefix() {
        let cigar = vec![Cigar::SoftClip(3), Cigar::Match(10)];
        assert_eq!(query_offset_at(&cigar, 100, 100), Some(3));
    }

    #[test]
    fn read_ids_are_stable_across_identical_parts() {
        let a = ReadId::new(b"read1", true, 100);
        let b = ReadId::new(b"read1", true, 100);
        let c = ReadId::new(b"read1", false, 100);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn weight_is_product_of_accuracies() {
        let obs = ReadObservation {
            read_id: ReadId::new(b"r", true, 0),
            allele: PileAllele::from(genome::Base::A),
            base_quality: Phred::new(30),
            mapping_quality: Phred::new(60),
            clipped: false,
            apparent_mismap: false,
            mate_unmapped: false,
            end_position: false,
        };
        let expected = Phred::new(30).accuracy() * Phred::new(60).accuracy();
        assert!((obs.weight() - expected).abs() < 1e-12);
        assert!(obs.counts_toward_weighted_depth());
    }
}
