use std::collections::HashSet;

use genome::{GenomePosition, Position};

use crate::cache::PileupCache;
use crate::classifier::Classifier;
use crate::config::Config;
use crate::pileup::Pileup;
use crate::read::ReadId;
use crate::result::HaplotypeResult;

/// Scans a `±haplotype_search_distance` window around a candidate, scoring
/// neighbor pileups for concordance with the candidate's two haplotypes and
/// counting other variants/triallelics/biallelics/de-novo-looking neighbors.
pub struct HaplotypeEvaluator<'a> {
    config: &'a Config,
    classifier: Classifier<'a>,
}

impl<'a> HaplotypeEvaluator<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            classifier: Classifier::new(config),
        }
    }

    /// `parents` carries one `PileupCache` per parent, fetched lazily by the
    /// caller only on first use (trio mode); `None` for solo mode.
    pub fn evaluate(
        &self,
        candidate_pos: &GenomePosition,
        child_cache: &PileupCache,
        parents: Option<(&PileupCache, &PileupCache)>,
    ) -> anyhow::Result<HaplotypeResult> {
        let d = self.config.haplotype_search_distance;
        let (lo, hi) = candidate_pos.window(d);
        let start = GenomePosition::new(candidate_pos.contig.clone(), candidate_pos.contig_index(), lo);
        let stop = GenomePosition::new(candidate_pos.contig.clone(), candidate_pos.contig_index(), hi);

        let child_range = child_cache.get_range(&start, &stop)?;
        let base_pileup = child_cache.get(candidate_pos)?;

        let mut result = HaplotypeResult::default();
        let mut denovo_positions: Vec<Position> = Vec::new();

        for (pos, pileup) in &child_range {
            if pos == candidate_pos {
                continue;
            }
            let depth = pileup.depth();
            if depth.bi_alleles().len() != 2 {
                continue;
            }

            if self.classifier.looks_variant(depth) {
                result.other_variants += 1;
                if self.classifier.more_than_two_viable(pileup) {
                    result.other_triallelics += 1;
                } else {
                    result.other_biallelics += 1;
                    if let Some(c) = concordance(&base_pileup, pileup) {
                        result.concordances.push(c);
                    }
                }
            }

            if self.looks_like_neighbor_de_novo(pileup, &base_pileup, pos, parents)? {
                denovo_positions.push(pos.position);
            }
        }

        let (adjacent, other) = split_adjacent(candidate_pos.position, &denovo_positions);
        result.adjacent_de_novos = adjacent;
        result.other_de_novos = other;

        Ok(result)
    }

    fn looks_like_neighbor_de_novo(
        &self,
        neighbor: &Pileup,
        base: &Pileup,
        neighbor_pos: &GenomePosition,
        parents: Option<(&PileupCache, &PileupCache)>,
    ) -> anyhow::Result<bool> {
        let depth = neighbor.depth();
        let (Some(a1), Some(a2)) = (depth.a1(), depth.a2()) else {
            return Ok(false);
        };
        let d1 = depth.allelic_raw_depth(&a1) as f64;
        let d2 = depth.allelic_raw_depth(&a2) as f64;

        let frac_and_depth = depth.weighted_minor_allele_fraction() >= self.config.min_allelic_frac
            && d1 >= self.config.min_other_dn_allelic_depth
            && d2 >= self.config.min_other_dn_allelic_depth;
        let independent =
            d1 >= self.config.min_other_dn_allelic_depth_independent && d2 >= self.config.min_other_dn_allelic_depth_independent;

        if !(frac_and_depth || independent) {
            return Ok(false);
        }

        let Some(c) = concordance(base, neighbor) else {
            return Ok(false);
        };
        if c < self.config.min_haplotype_concordance {
            return Ok(false);
        }

        let (parent1, parent2) = match parents {
            Some((c1, c2)) => (Some(c1.get(neighbor_pos)?), Some(c2.get(neighbor_pos)?)),
            None => (None, None),
        };
        Ok(self.classifier.looks_denovo(depth, parent1.as_deref(), parent2.as_deref()))
    }
}

/// §4.5a: concordance between the candidate pileup `base` and a neighbor
/// pileup `search`, or `None` when neither of the base's haplotype read
/// sets intersects the neighbor at all.
pub fn concordance(base: &Pileup, search: &Pileup) -> Option<f64> {
    let bd = base.depth();
    let sd = search.depth();
    let a1 = bd.a1()?;
    let a2 = bd.a2()?;

    let h1 = bd.allelic_records(&a1);
    let h2 = bd.allelic_records(&a2);
    let s_all = search.all_records();

    let n1 = h1.intersection(&s_all).count();
    let n2 = h2.intersection(&s_all).count();
    if n1 == 0 && n2 == 0 {
        return None;
    }

    let s1 = sd.a1().map(|a| sd.allelic_records(&a)).unwrap_or_default();
    let s2 = sd.a2().map(|a| sd.allelic_records(&a)).unwrap_or_default();

    let overlap_frac = |haplotype: &HashSet<ReadId>, allele_set: &HashSet<ReadId>, denom: usize| -> f64 {
        if denom == 0 {
            1.0
        } else {
            haplotype.intersection(allele_set).count() as f64 / denom as f64
        }
    };

    let cis = f64::min(overlap_frac(&h1, &s1, n1), overlap_frac(&h2, &s2, n2));
    let trans = f64::min(overlap_frac(&h1, &s2, n1), overlap_frac(&h2, &s1, n2));
    Some(cis.max(trans))
}

/// Split de novo-looking neighbor positions into the contiguous run
/// extending outward from `center ± 1` ("adjacent") and everything else.
fn split_adjacent(center: Position, positions: &[Position]) -> (u32, u32) {
    let set: HashSet<u32> = positions.iter().map(|p| u32::from(*p)).collect();
    let center = u32::from(center);
    let mut adjacent = 0u32;

    let mut up = center + 1;
    while set.contains(&up) {
        adjacent += 1;
        up += 1;
    }
    let mut down = center;
    while down > 0 {
        down -= 1;
        if !set.contains(&down) {
            break;
        }
        adjacent += 1;
    }

    let other = positions.len() as u32 - adjacent;
    (adjacent, other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pileup::PileupBuilder;
    use crate::read::{ReadId, ReadObservation};
    use genome::{Base, ContigTable, Phred, PileAllele};

    fn pos_at(table: &mut ContigTable, p: u32) -> GenomePosition {
        table.position("chr1", Position(p))
    }

    fn make_obs(allele: Base, read: &str) -> ReadObservation {
        ReadObservation {
            read_id: ReadId::new(read.as_bytes(), true, 0),
            allele: PileAllele::from(allele),
            base_quality: Phred::new(30),
            mapping_quality: Phred::new(60),
            clipped: false,
            apparent_mismap: false,
            mate_unmapped: false,
            end_position: false,
        }
    }

    #[test]
    fn e4_fully_cis_concordant_neighbor_scores_one() {
        let mut table = ContigTable::new();
        let p = pos_at(&mut table, 1000);
        let q = pos_at(&mut table, 1050);

        let mut base_builder = PileupBuilder::new();
        let mut search_builder = PileupBuilder::new();
        for i in 0..20 {
            let read = format!("hapA{i}");
            base_builder.add(&make_obs(Base::A, &read));
            search_builder.add(&make_obs(Base::C, &read));
        }
        for i in 0..20 {
            let read = format!("hapG{i}");
            base_builder.add(&make_obs(Base::G, &read));
            search_builder.add(&make_obs(Base::T, &read));
        }
        let base = base_builder.build(p);
        let search = search_builder.build(q);

        let c = concordance(&base, &search).unwrap();
        assert!((c - 1.0).abs() < 1e-9);
    }

    #[test]
    fn e5_anti_concordant_artifact_scores_around_half() {
        let mut table = ContigTable::new();
        let p = pos_at(&mut table, 1000);
        let q = pos_at(&mut table, 1050);

        let mut base_builder = PileupBuilder::new();
        let mut search_builder = PileupBuilder::new();
        for i in 0..20 {
            let read = format!("hapA{i}");
            base_builder.add(&make_obs(Base::A, &read));
            let q_allele = if i % 2 == 0 { Base::C } else { Base::T };
            search_builder.add(&make_obs(q_allele, &read));
        }
        for i in 0..20 {
            let read = format!("hapG{i}");
            base_builder.add(&make_obs(Base::G, &read));
            let q_allele = if i % 2 == 0 { Base::C } else { Base::T };
            search_builder.add(&make_obs(q_allele, &read));
        }
        let base = base_builder.build(p);
        let search = search_builder.build(q);

        let c = concordance(&base, &search).unwrap();
        assert!((c - 0.5).abs() < 1e-6, "expected ~0.5, got {c}");
        assert!(c < 0.75, "anti-concordant site must fall below the default haplotype concordance floor");
    }

    #[test]
    fn adjacent_run_counts_until_first_gap() {
        let center = Position(1000);
        // 999 (p-1) is absent, so the downward run never starts even though
        // 998 is nearby: contiguity must hold from p+-1 outward with no gap.
        let positions = [Position(1001), Position(1002), Position(1005), Position(998)];
        let (adjacent, other) = split_adjacent(center, &positions);
        assert_eq!(adjacent, 2); // 1001, 1002 upward
        assert_eq!(other, 2); // 1005 and 998 are not contiguous with p
    }

    #[test]
    fn adjacent_run_extends_downward_when_contiguous() {
        let center = Position(1000);
        let positions = [Position(999), Position(998), Position(1005)];
        let (adjacent, other) = split_adjacent(center, &positions);
        assert_eq!(adjacent, 2);
        assert_eq!(other, 1);
    }
}
