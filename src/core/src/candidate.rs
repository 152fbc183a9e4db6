use std::collections::HashSet;
use std::path::Path;

use genome::{Base, ContigTable, GenomePosition, Position};
use located_error::prelude::*;
use log::{debug, warn};
use rust_htslib::bcf::{record::GenotypeAllele, IndexedReader, Read as BcfRead};

use crate::config::Config;
use crate::error::CandidateError;
use crate::result::ReferencePosition;

const BIN_SIZE: u32 = 100_000;

/// One 100 kb unit of parallelism over a contig (§4.4 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenomeBin {
    pub contig_index: u32,
    pub start: u32,
    pub end: u32,
}

/// Enumerate the 100 kb bins covering every contig in `table`, given each
/// contig's length (as reported by the VCF header).
pub fn genome_bins(table: &ContigTable, contig_lengths: &[(u32, u32)]) -> Vec<GenomeBin> {
    let mut bins = Vec::new();
    for &(contig_index, length) in contig_lengths {
        let _ = table.name_of(contig_index);
        let mut start = 0;
        while start < length {
            let end = (start + BIN_SIZE).min(length);
            bins.push(GenomeBin { contig_index, start, end });
            start = end;
        }
    }
    bins
}

/// Streams candidate positions from a region-scoped VCF/BCF query, filters
/// by genotype shape, and rejects sites already supported in either parent.
pub struct CandidateParser<'a> {
    config: &'a Config,
    child_sample_idx: usize,
    parent_sample_idx: Option<(usize, usize)>,
}

impl<'a> CandidateParser<'a> {
    pub fn new(config: &'a Config, child_sample_idx: usize, parent_sample_idx: Option<(usize, usize)>) -> Self {
        Self {
            config,
            child_sample_idx,
            parent_sample_idx,
        }
    }

    /// Stream candidates within `[start, stop)` on `contig_name`, deduping
    /// positions a bin boundary might double-report.
    pub fn parse_bin(
        &self,
        vcf_path: &Path,
        contig_name: &str,
        start: u32,
        stop: u32,
        table: &mut ContigTable,
    ) -> anyhow::Result<Vec<ReferencePosition>> {
        let mut reader = IndexedReader::from_path(vcf_path)
            .with_loc(|| format!("failed to open indexed VCF/BCF at {}", vcf_path.display()))?;
        let rid = reader
            .header()
            .name2rid(contig_name.as_bytes())
            .map_err(|_| CandidateError::UnknownContig(contig_name.to_string()))
            .loc("resolving contig name in candidate VCF header")?;
        reader
            .fetch(rid, u64::from(start), Some(u64::from(stop)))
            .with_loc(|| format!("fetching candidate VCF region {contig_name}:{start}-{stop}"))?;

        let mut seen: HashSet<GenomePosition> = HashSet::new();
        let mut out = Vec::new();

        for record_result in reader.records() {
            let record = record_result.with_loc(|| format!("reading VCF record in {contig_name}:{start}-{stop}"))?;

            if !self.alleles_are_snv(&record) {
                debug!("skipping non-SNV candidate at {contig_name}:{}", record.pos() + 1);
                continue;
            }

            let genotypes = match record.genotypes() {
                Ok(g) => g,
                Err(e) => {
                    debug!("skipping candidate with unreadable genotypes at {contig_name}:{}: {e}", record.pos() + 1);
                    continue;
                }
            };
            let child_gt = genotypes.get(self.child_sample_idx);
            let Some(alt_allele_idx) = single_non_ref_allele(&child_gt) else {
                debug!("skipping candidate: child genotype is not single-non-ref at {contig_name}:{}", record.pos() + 1);
                continue;
            };

            if let Some((p1_idx, p2_idx)) = self.parent_sample_idx {
                if self.seen_in_parent_vcf(&record, p1_idx, alt_allele_idx)
                    || self.seen_in_parent_vcf(&record, p2_idx, alt_allele_idx)
                {
                    debug!("dropping candidate seen in parent VCF at {contig_name}:{}", record.pos() + 1);
                    continue;
                }
            }

            match self.to_reference_position(&record, alt_allele_idx, contig_name, table) {
                Ok(reference) => {
                    if seen.insert(reference.position.clone()) {
                        out.push(reference);
                    }
                }
                Err(e) => warn!("failed to construct candidate position at {contig_name}:{}: {e}", record.pos() + 1),
            }
        }

        Ok(out)
    }

    fn alleles_are_snv(&self, record: &rust_htslib::bcf::Record) -> bool {
        record.alleles().iter().all(|a| a.len() == 1)
    }

    fn seen_in_parent_vcf(&self, record: &rust_htslib::bcf::Record, parent_idx: usize, alt_allele_idx: usize) -> bool {
        let Ok(ad) = record.format(b"AD").integer() else {
            return false;
        };
        let Some(sample_ad) = ad.get(parent_idx) else {
            return false;
        };
        sample_ad
            .get(alt_allele_idx)
            .is_some_and(|ad_value| *ad_value > self.config.vcf_max_parent_ad)
    }

    fn to_reference_position(
        &self,
        record: &rust_htslib::bcf::Record,
        alt_allele_idx: usize,
        contig_name: &str,
        table: &mut ContigTable,
    ) -> Result<ReferencePosition, CandidateError> {
        let alleles = record.alleles();
        let ref_bytes = alleles.first().copied().unwrap_or_default();
        if ref_bytes.len() != 1 {
            return Err(CandidateError::NotSingleBase(ref_bytes.to_vec()));
        }
        let reference = Base::try_from(ref_bytes[0])?;

        let alt_bytes = alleles.get(alt_allele_idx).copied().ok_or(CandidateError::NoAltAllele)?;
        if alt_bytes.len() != 1 {
            return Err(CandidateError::NotSnv);
        }
        let alt = Base::try_from(alt_bytes[0])?;

        let position = table.position(contig_name, Position(u32::try_from(record.pos() + 1).unwrap_or(u32::MAX)));
        Ok(ReferencePosition {
            position,
            reference,
            alt: Some(alt),
        })
    }
}

/// `ploidy == 1` OR `(het AND NOT het-nonref)`: returns the allele index of
/// the single non-reference call, or `None` if the genotype shape doesn't
/// match (homozygous ref, homozygous non-ref, het-nonref, missing, etc.).
fn single_non_ref_allele(gt: &rust_htslib::bcf::record::Genotype) -> Option<usize> {
    let alleles: Vec<Option<usize>> = gt
        .iter()
        .map(|a| match *a {
            GenotypeAllele::Unphased(i) | GenotypeAllele::Phased(i) => Some(i as usize),
            GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => None,
        })
        .collect();

    match alleles.as_slice() {
        [Some(a)] => {
            if *a == 0 {
                None
            } else {
                Some(*a)
            }
        }
        [Some(a), Some(b)] => {
            if a == b {
                None
            } else if *a == 0 {
                Some(*b)
            } else if *b == 0 {
                Some(*a)
            } else {
                None // het-nonref: two distinct non-ref alleles, rejected
            }
        }
        _ => None,
    }
}
