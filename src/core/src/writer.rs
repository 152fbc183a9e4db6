use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::annotate::Annotation;
use crate::result::DeNovoResult;

const DAMAGING_IMPACTS: [&str; 2] = ["HIGH", "MODERATE"];

/// A result paired with the annotation the (external) annotator produced
/// for it, in lockstep order (§6's annotator contract).
pub struct AnnotatedResult {
    pub result: DeNovoResult,
    pub annotation: Annotation,
    pub is_super_novo: bool,
}

/// Writes the final result set. `.` renders any missing optional value, and
/// nested records are flattened `<outer>_<inner>` per §6.
pub trait ResultWriter {
    fn write_results(&self, path: &Path, results: &[AnnotatedResult], sample_roles: &[String]) -> anyhow::Result<()>;
    fn write_summary(&self, path: &Path, results: &[AnnotatedResult]) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct TsvWriter;

fn opt_char(c: Option<char>) -> String {
    c.map_or_else(|| ".".to_string(), |c| c.to_string())
}

fn opt_str(s: &Option<String>) -> String {
    s.clone().unwrap_or_else(|| ".".to_string())
}

fn opt_bool(b: Option<bool>) -> String {
    b.map_or_else(|| ".".to_string(), |b| b.to_string())
}

impl TsvWriter {
    fn header(sample_roles: &[String]) -> Vec<String> {
        let mut cols = vec![
            "position_contig".to_string(),
            "position_position".to_string(),
            "reference".to_string(),
            "alt".to_string(),
            "haplotype_other_variants".to_string(),
            "haplotype_other_triallelics".to_string(),
            "haplotype_other_biallelics".to_string(),
            "haplotype_adjacent_de_novos".to_string(),
            "haplotype_other_de_novos".to_string(),
            "haplotype_concordances".to_string(),
            "superNovo".to_string(),
            "snpeffGene".to_string(),
            "snpeffImpact".to_string(),
            "dnIsRef".to_string(),
        ];
        for role in sample_roles {
            for field in [
                "sample_id",
                "weighted_depth_a1",
                "weighted_depth_a2",
                "raw_depth_a1",
                "raw_depth_a2",
                "clipped_a1",
                "clipped_a2",
                "apparent_mismap_a1",
                "apparent_mismap_a2",
                "unmapped_mate_a1",
                "unmapped_mate_a2",
                "end_position_a1",
                "end_position_a2",
            ] {
                cols.push(format!("{role}_{field}"));
            }
        }
        cols
    }

    fn row(entry: &AnnotatedResult, sample_roles: &[String]) -> Vec<String> {
        let r = &entry.result;
        let mut cols = vec![
            r.reference.position.contig.to_string(),
            r.reference.position.position.to_string(),
            r.reference.reference.to_string(),
            opt_char(r.reference.alt.map(char::from)),
            r.haplotype.other_variants.to_string(),
            r.haplotype.other_triallelics.to_string(),
            r.haplotype.other_biallelics.to_string(),
            r.haplotype.adjacent_de_novos.to_string(),
            r.haplotype.other_de_novos.to_string(),
            if r.haplotype.concordances.is_empty() {
                ".".to_string()
            } else {
                r.haplotype
                    .concordances
                    .iter()
                    .map(|c| format!("{c:.4}"))
                    .collect::<Vec<_>>()
                    .join(",")
            },
            entry.is_super_novo.to_string(),
            opt_str(&entry.annotation.snpeff_gene),
            opt_str(&entry.annotation.snpeff_impact),
            opt_bool(entry.annotation.dn_is_ref),
        ];

        for (idx, _role) in sample_roles.iter().enumerate() {
            match r.samples.get(idx) {
                Some(s) => {
                    cols.push(s.sample_id.clone());
                    cols.push(format!("{:.4}", s.weighted_depth_a1));
                    cols.push(format!("{:.4}", s.weighted_depth_a2));
                    cols.push(s.raw_depth_a1.to_string());
                    cols.push(s.raw_depth_a2.to_string());
                    cols.push(s.clipped_a1.to_string());
                    cols.push(s.clipped_a2.to_string());
                    cols.push(s.apparent_mismap_a1.to_string());
                    cols.push(s.apparent_mismap_a2.to_string());
                    cols.push(s.unmapped_mate_a1.to_string());
                    cols.push(s.unmapped_mate_a2.to_string());
                    cols.push(s.end_position_a1.to_string());
                    cols.push(s.end_position_a2.to_string());
                }
                None => cols.extend(std::iter::repeat(".".to_string()).take(13)),
            }
        }
        cols
    }
}

impl ResultWriter for TsvWriter {
    fn write_results(&self, path: &Path, results: &[AnnotatedResult], sample_roles: &[String]) -> anyhow::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", Self::header(sample_roles).join("\t"))?;
        for entry in results {
            writeln!(writer, "{}", Self::row(entry, sample_roles).join("\t"))?;
        }
        Ok(())
    }

    fn write_summary(&self, path: &Path, results: &[AnnotatedResult]) -> anyhow::Result<()> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        let bump = |counts: &mut BTreeMap<String, u64>, key: String| *counts.entry(key).or_insert(0) += 1;

        for entry in results.iter().filter(|e| e.is_super_novo) {
            bump(&mut counts, "supernovo".to_string());

            let impact = entry.annotation.snpeff_impact.as_deref();
            let damaging = impact.is_some_and(|i| DAMAGING_IMPACTS.contains(&i));
            if damaging {
                bump(&mut counts, "supernovo_damaging".to_string());
                if entry.annotation.dn_is_ref == Some(false) {
                    bump(&mut counts, "supernovo_damaging_nonref".to_string());
                }
                if let Some(gene) = &entry.annotation.snpeff_gene {
                    bump(&mut counts, format!("{gene}_AnyImpact"));
                }
            }
            if let Some(impact) = impact {
                bump(&mut counts, impact.to_string());
            }
            if let Some(gene) = &entry.annotation.snpeff_gene {
                bump(&mut counts, gene.clone());
            }
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        for (key, count) in counts {
            writeln!(writer, "{key}\t{count}")?;
        }
        Ok(())
    }
}
