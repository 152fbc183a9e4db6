/// Thresholds shared by the classifier, candidate parser and haplotype
/// evaluator. Constructed once by the CLI layer and passed by reference
/// everywhere else: no process-wide singleton (see `DESIGN.md`).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub min_depth: f64,
    pub min_allelic_depth: usize,
    pub min_allelic_frac: f64,
    pub max_miscall_frac: f64,
    pub max_miscall_weight: f64,
    pub vcf_max_parent_ad: i32,
    pub min_parental_depth: f64,
    pub min_other_dn_allelic_depth: f64,
    pub min_other_dn_allelic_depth_independent: f64,
    pub min_haplotype_concordance: f64,
    pub haplotype_search_distance: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_depth: 10.0,
            min_allelic_depth: 4,
            min_allelic_frac: 0.10,
            max_miscall_frac: 0.05,
            max_miscall_weight: 1.0,
            vcf_max_parent_ad: 4,
            min_parental_depth: 10.0,
            min_other_dn_allelic_depth: 1.5,
            min_other_dn_allelic_depth_independent: 3.0,
            min_haplotype_concordance: 0.75,
            haplotype_search_distance: 150,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.min_depth, 10.0);
        assert_eq!(cfg.min_allelic_depth, 4);
        assert_eq!(cfg.vcf_max_parent_ad, 4);
        assert_eq!(cfg.haplotype_search_distance, 150);
    }
}
