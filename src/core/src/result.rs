use genome::{Base, GenomePosition};

/// A [`GenomePosition`] plus the reference/alt alleles resolved from a
/// candidate record. Construction fails when the reference allele is not a
/// single base, or no single non-reference allele is present in the child's
/// genotype (see [`crate::candidate::CandidateParser`]).
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePosition {
    pub position: GenomePosition,
    pub reference: Base,
    pub alt: Option<Base>,
}

/// `(other_variants, other_triallelics, other_biallelics, adjacent_de_novos,
/// other_de_novos, concordances)`, accumulated by the Haplotype Evaluator
/// while scanning a window around a candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HaplotypeResult {
    pub other_variants: u32,
    pub other_triallelics: u32,
    pub other_biallelics: u32,
    pub adjacent_de_novos: u32,
    pub other_de_novos: u32,
    pub concordances: Vec<f64>,
}

impl HaplotypeResult {
    /// `true` when this candidate has strong enough haplotype and
    /// neighborhood support to be reported as a SuperNovo call (the
    /// `superNovo` boolean of §9/GLOSSARY).
    pub fn is_super_novo(&self, min_concordance: f64) -> bool {
        self.concordances.iter().any(|c| *c >= min_concordance) && self.adjacent_de_novos + self.other_de_novos > 0
    }
}

/// Per-sample numeric fields of interest at a candidate, framed relative to
/// the child's A1/A2 so that parent fields are directly comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub sample_id: String,
    pub weighted_depth_a1: f64,
    pub weighted_depth_a2: f64,
    pub raw_depth_a1: usize,
    pub raw_depth_a2: usize,
    pub clipped_a1: u32,
    pub clipped_a2: u32,
    pub apparent_mismap_a1: u32,
    pub apparent_mismap_a2: u32,
    pub unmapped_mate_a1: u32,
    pub unmapped_mate_a2: u32,
    pub end_position_a1: u32,
    pub end_position_a2: u32,
}

/// `ReferencePosition` + `HaplotypeResult` + one `Sample` per participating
/// sample (child alone in solo mode; child, parent1, parent2 in trio mode).
///
/// Solo-mode results are always computed once `looks_variant` passes, since
/// with no parents the parental allele set is empty and every biallelic
/// child site trivially passes `looks_denovo` (see `DESIGN.md`, "Open
/// question — solo de novo call"). A solo `DeNovoResult` is only meaningful
/// when its `haplotype.is_super_novo(..)` is also true; callers filtering
/// for credible de novo events should check that, not mere presence.
#[derive(Debug, Clone, PartialEq)]
pub struct DeNovoResult {
    pub reference: ReferencePosition,
    pub haplotype: HaplotypeResult,
    pub samples: Vec<Sample>,
}
