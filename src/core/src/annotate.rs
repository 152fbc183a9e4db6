use crate::result::DeNovoResult;

/// Functional annotation populated on a result by the external annotator
/// (SnpEff/Annovar). The core treats the actual annotator invocation as an
/// opaque collaborator (§6); this module only defines the seam.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    pub snpeff_gene: Option<String>,
    pub snpeff_impact: Option<String>,
    pub dn_is_ref: Option<bool>,
}

/// A collaborator that decorates `DeNovoResult`s with functional annotation.
/// Invoking SnpEff/Annovar is out of scope; production wiring is expected
/// to shell out or link against those tools behind this trait.
pub trait Annotator {
    fn annotate(&self, results: &[DeNovoResult], genome_build: &str) -> anyhow::Result<Vec<Annotation>>;
}

/// Test double: returns an empty [`Annotation`] for every result. Used
/// wherever the pipeline needs an `Annotator` but no real annotation step is
/// configured (e.g. `--snpEff`/`--annovarDir` both absent).
#[derive(Debug, Default)]
pub struct NoopAnnotator;

impl Annotator for NoopAnnotator {
    fn annotate(&self, results: &[DeNovoResult], _genome_build: &str) -> anyhow::Result<Vec<Annotation>> {
        Ok(vec![Annotation::default(); results.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_annotator_returns_one_empty_annotation_per_result() {
        let annotator = NoopAnnotator;
        let results: Vec<DeNovoResult> = Vec::new();
        let annotations = annotator.annotate(&results, "GRCh38").unwrap();
        assert_eq!(annotations.len(), 0);
    }
}
