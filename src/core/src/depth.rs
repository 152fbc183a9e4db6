use std::collections::{HashMap, HashSet};

use genome::PileAllele;

use crate::pileup::AlleleStats;
use crate::read::ReadId;

/// The two dominant alleles at a position by weighted depth, and the
/// depth-derived quantities built from them. Computed once when a
/// [`crate::pileup::Pileup`] is built and cached alongside it.
#[derive(Debug, Clone, Default)]
pub struct Depth {
    a1: Option<(PileAllele, f64)>,
    a2: Option<(PileAllele, f64)>,
    weighted_depth: HashMap<PileAllele, f64>,
    raw_depth: HashMap<PileAllele, usize>,
    records: HashMap<PileAllele, HashSet<ReadId>>,
}

impl Depth {
    pub(crate) fn from_stats(stats: &HashMap<PileAllele, AlleleStats>) -> Self {
        let mut ranked: Vec<(PileAllele, f64)> =
            stats.iter().map(|(allele, s)| (*allele, s.weighted_depth)).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let a1 = ranked.first().copied();
        let a2 = ranked.get(1).copied();

        let weighted_depth = stats.iter().map(|(a, s)| (*a, s.weighted_depth)).collect();
        let raw_depth = stats.iter().map(|(a, s)| (*a, s.records.len())).collect();
        let records = stats.iter().map(|(a, s)| (*a, s.records.clone())).collect();

        Self {
            a1,
            a2,
            weighted_depth,
            raw_depth,
            records,
        }
    }

    pub fn a1(&self) -> Option<PileAllele> {
        self.a1.map(|(a, _)| a)
    }

    pub fn a2(&self) -> Option<PileAllele> {
        self.a2.map(|(a, _)| a)
    }

    /// `{A1, A2}`, size 0, 1 or 2 depending on how many alleles were seen.
    pub fn bi_alleles(&self) -> HashSet<PileAllele> {
        [self.a1(), self.a2()].into_iter().flatten().collect()
    }

    pub fn allelic_weighted_depth(&self, allele: &PileAllele) -> f64 {
        self.weighted_depth.get(allele).copied().unwrap_or(0.0)
    }

    pub fn allelic_raw_depth(&self, allele: &PileAllele) -> usize {
        self.raw_depth.get(allele).copied().unwrap_or(0)
    }

    pub fn allelic_records(&self, allele: &PileAllele) -> HashSet<ReadId> {
        self.records.get(allele).cloned().unwrap_or_default()
    }

    pub fn weighted_biallelic_depth(&self) -> f64 {
        let wd1 = self.a1.map_or(0.0, |(_, d)| d);
        let wd2 = self.a2.map_or(0.0, |(_, d)| d);
        wd1 + wd2
    }

    /// `wd(A2) / (wd(A1) + wd(A2))`. `0.0` when fewer than two alleles were
    /// observed or the biallelic depth is zero.
    pub fn weighted_minor_allele_fraction(&self) -> f64 {
        let total = self.weighted_biallelic_depth();
        if total <= 0.0 {
            return 0.0;
        }
        let wd2 = self.a2.map_or(0.0, |(_, d)| d);
        wd2 / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(weighted: f64, raw: usize) -> AlleleStats {
        let mut records = HashSet::new();
        for i in 0..raw {
            records.insert(ReadId::new(format!("r{i}").as_bytes(), true, 0));
        }
        AlleleStats {
            records,
            weighted_depth: weighted,
            clipped_count: 0,
            end_position_count: 0,
            apparent_mismap_count: 0,
            unmapped_mate_count: 0,
        }
    }

    #[test]
    fn ranks_two_highest_alleles_as_a1_a2() {
        let mut m = HashMap::new();
        m.insert(PileAllele::from(genome::Base::A), stats(20.0, 20));
        m.insert(PileAllele::from(genome::Base::G), stats(19.98, 20));
        m.insert(PileAllele::from(genome::Base::C), stats(1.0, 1));
        let depth = Depth::from_stats(&m);
        assert_eq!(depth.a1(), Some(PileAllele::from(genome::Base::A)));
        assert_eq!(depth.a2(), Some(PileAllele::from(genome::Base::G)));
        assert!((depth.weighted_minor_allele_fraction() - 0.4995).abs() < 1e-2);
    }

    #[test]
    fn empty_pileup_has_no_bi_alleles() {
        let depth = Depth::from_stats(&HashMap::new());
        assert!(depth.bi_alleles().is_empty());
        assert_eq!(depth.weighted_minor_allele_fraction(), 0.0);
    }
}
