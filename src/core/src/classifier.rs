use std::collections::HashSet;

use genome::PileAllele;
use log::warn;

use crate::config::Config;
use crate::depth::Depth;
use crate::pileup::Pileup;

/// Free-standing, `Config`-parameterized predicates over pileups and
/// depths. Kept separate from the haplotype evaluator (which calls it) to
/// avoid the teacher's cyclic `this`-passing between evaluator and
/// haplotype evaluator (see `DESIGN.md`).
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    config: &'a Config,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn looks_variant(&self, depth: &Depth) -> bool {
        if depth.bi_alleles().len() != 2 {
            return false;
        }
        let Some(a1) = depth.a1() else { return false };
        let Some(a2) = depth.a2() else { return false };

        depth.weighted_biallelic_depth() >= self.config.min_depth
            && depth.weighted_minor_allele_fraction() >= self.config.min_allelic_frac
            && depth.allelic_raw_depth(&a1) >= self.config.min_allelic_depth
            && depth.allelic_raw_depth(&a2) >= self.config.min_allelic_depth
    }

    /// Alleles whose raw count exceeds `max_miscall_weight` or whose
    /// fraction of the pileup's total raw count exceeds `max_miscall_frac`.
    pub fn possible_alleles(&self, pileup: &Pileup) -> HashSet<PileAllele> {
        let total = pileup.total_raw_depth();
        pileup
            .alleles()
            .filter(|allele| {
                let raw = pileup.raw_depth(allele);
                let frac = if total == 0 { 0.0 } else { raw as f64 / total as f64 };
                raw as f64 > self.config.max_miscall_weight || frac > self.config.max_miscall_frac
            })
            .copied()
            .collect()
    }

    pub fn more_than_two_viable(&self, pileup: &Pileup) -> bool {
        self.possible_alleles(pileup).len() > 2
    }

    pub fn looks_biallelic(&self, pileup: &Pileup, depth: &Depth) -> bool {
        self.looks_variant(depth) && !self.more_than_two_viable(pileup)
    }

    /// The sole allele in `child.bi_alleles \ parental`, or `None` if zero
    /// or more than one candidate remains (ambiguous: logged and dropped).
    pub fn dn_allele(
        &self,
        child_depth: &Depth,
        parent1: Option<&Pileup>,
        parent2: Option<&Pileup>,
    ) -> Option<PileAllele> {
        let mut parental: HashSet<PileAllele> = HashSet::new();
        if let Some(p) = parent1 {
            parental.extend(self.possible_alleles(p));
        }
        if let Some(p) = parent2 {
            parental.extend(self.possible_alleles(p));
        }

        let candidates: Vec<PileAllele> = child_depth
            .bi_alleles()
            .into_iter()
            .filter(|a| !parental.contains(a))
            .collect();

        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => {
                warn!("ambiguous de novo allele: {candidates:?} remain after removing parental alleles");
                None
            }
        }
    }

    pub fn looks_denovo(
        &self,
        child_depth: &Depth,
        parent1: Option<&Pileup>,
        parent2: Option<&Pileup>,
    ) -> bool {
        self.dn_allele(child_depth, parent1, parent2).is_some()
    }
}
