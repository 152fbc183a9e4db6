use std::path::{Path, PathBuf};

use dashmap::DashMap;
use genome::{ContigTable, GenomePosition};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use rust_htslib::bcf::IndexedReader as BcfIndexedReader;

use crate::annotate::{Annotation, Annotator};
use crate::cache::PileupCache;
use crate::candidate::{genome_bins, CandidateParser};
use crate::classifier::Classifier;
use crate::checkpoint;
use crate::config::Config;
use crate::haplotype::HaplotypeEvaluator;
use crate::result::{DeNovoResult, ReferencePosition, Sample};
use crate::writer::{AnnotatedResult, ResultWriter};

/// Which samples participate, and where their BAMs live.
pub enum Mode {
    Solo {
        child_bam: PathBuf,
        child_id: String,
    },
    Trio {
        child_bam: PathBuf,
        child_id: String,
        parent1_bam: PathBuf,
        parent1_id: String,
        parent2_bam: PathBuf,
        parent2_id: String,
    },
}

impl Mode {
    fn sample_roles(&self) -> Vec<String> {
        match self {
            Mode::Solo { child_id, .. } => vec![child_id.clone()],
            Mode::Trio {
                child_id, parent1_id, parent2_id, ..
            } => vec![child_id.clone(), parent1_id.clone(), parent2_id.clone()],
        }
    }
}

pub struct OrchestratorPaths {
    pub vcf: PathBuf,
    pub output: PathBuf,
}

/// The thin controller: bins the genome, fans candidate parsing and
/// evaluation out in parallel, checkpoints periodically, and hands the
/// final sorted result set to the annotator and writers (§4.6, §5).
pub struct Orchestrator<'a> {
    pub config: &'a Config,
    pub mode: Mode,
    pub paths: OrchestratorPaths,
    pub genome_build: String,
    pub pileup_cache_capacity: usize,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a Config, mode: Mode, paths: OrchestratorPaths, genome_build: String) -> Self {
        Self {
            config,
            mode,
            paths,
            genome_build,
            pileup_cache_capacity: crate::cache::DEFAULT_CAPACITY,
        }
    }

    /// Run the whole pipeline end to end, writing final outputs via
    /// `annotator`/`writer`. Returns the count of surviving (non-`None`)
    /// results.
    pub fn run(&self, annotator: &dyn Annotator, writer: &dyn ResultWriter, checkpoint_path: &Path) -> anyhow::Result<usize> {
        let results: DashMap<GenomePosition, Option<DeNovoResult>> = DashMap::new();

        if checkpoint_path.exists() {
            match checkpoint::read_snapshot(checkpoint_path) {
                Ok(entries) => {
                    info!("resuming from checkpoint with {} entries", entries.len());
                    for (pos, result) in entries {
                        results.insert(pos, result);
                    }
                }
                Err(e) => error!("snapshot at {} unreadable, restarting from empty state: {e}", checkpoint_path.display()),
            }
        }

        let candidates = self.parse_candidates()?;
        let candidate_set: std::collections::HashSet<GenomePosition> = candidates.iter().map(|c| c.position.clone()).collect();

        results.retain(|pos, _| candidate_set.contains(pos));

        let pending: Vec<ReferencePosition> = candidates
            .into_iter()
            .filter(|c| !results.contains_key(&c.position))
            .collect();
        info!("{} candidates pending evaluation", pending.len());

        let child_bam = match &self.mode {
            Mode::Solo { child_bam, .. } | Mode::Trio { child_bam, .. } => child_bam.clone(),
        };
        let child_cache = PileupCache::open(&child_bam, self.pileup_cache_capacity)?;
        let parent_caches = match &self.mode {
            Mode::Solo { .. } => None,
            Mode::Trio {
                parent1_bam, parent2_bam, ..
            } => Some((
                PileupCache::open(parent1_bam, self.pileup_cache_capacity)?,
                PileupCache::open(parent2_bam, self.pileup_cache_capacity)?,
            )),
        };

        let classifier = Classifier::new(self.config);
        let evaluator = HaplotypeEvaluator::new(self.config);

        pending.into_par_iter().for_each(|candidate| {
            let outcome = self.evaluate_one(&candidate, &child_cache, parent_caches.as_ref(), &classifier, &evaluator);
            match outcome {
                Ok(result) => {
                    results.insert(candidate.position.clone(), result);
                }
                Err(e) => {
                    warn!("skipping candidate at {}: {e:#}", candidate.position);
                    results.insert(candidate.position.clone(), None);
                }
            }
        });

        let entries: Vec<(GenomePosition, Option<DeNovoResult>)> = results.iter().map(|kv| (kv.key().clone(), kv.value().clone())).collect();
        checkpoint::write_snapshot(checkpoint_path, &entries)?;

        let mut surviving: Vec<DeNovoResult> = entries.into_iter().filter_map(|(_, r)| r).collect();
        surviving.sort_by(|a, b| a.reference.position.cmp(&b.reference.position));

        let annotations: Vec<Annotation> = if surviving.is_empty() {
            Vec::new()
        } else {
            annotator.annotate(&surviving, &self.genome_build)?
        };

        let sample_roles = self.mode.sample_roles();
        let annotated: Vec<AnnotatedResult> = surviving
            .into_iter()
            .zip(annotations.into_iter().chain(std::iter::repeat(Annotation::default())))
            .map(|(result, annotation)| {
                let is_super_novo = result.haplotype.is_super_novo(self.config.min_haplotype_concordance);
                AnnotatedResult {
                    result,
                    annotation,
                    is_super_novo,
                }
            })
            .collect();

        writer.write_results(&self.paths.output, &annotated, &sample_roles)?;
        let summary_path = self.paths.output.with_extension("summary.txt");
        writer.write_summary(&summary_path, &annotated)?;

        Ok(annotated.iter().filter(|a| a.is_super_novo).count())
    }

    fn parse_candidates(&self) -> anyhow::Result<Vec<ReferencePosition>> {
        let mut reader = BcfIndexedReader::from_path(&self.paths.vcf)?;
        let header = reader.header();
        let contig_lengths: Vec<(u32, u32)> = (0..header.contig_count())
            .map(|rid| (rid, header.target_len(rid).unwrap_or(0) as u32))
            .collect();
        let mut table = ContigTable::new();
        for rid in 0..header.contig_count() {
            if let Some(name) = header.rid2name(rid).ok().map(|n| String::from_utf8_lossy(n).to_string()) {
                table.intern(name);
            }
        }
        drop(reader);

        let bins = genome_bins(&table, &contig_lengths);

        let child_id = match &self.mode {
            Mode::Solo { child_id, .. } | Mode::Trio { child_id, .. } => child_id.clone(),
        };

        let reader_for_header = BcfIndexedReader::from_path(&self.paths.vcf)?;
        let header_samples = reader_for_header.header().samples();
        let sample_idx = |id: &str| -> anyhow::Result<usize> {
            header_samples
                .iter()
                .position(|s| String::from_utf8_lossy(s) == id)
                .ok_or_else(|| anyhow::anyhow!("sample id {id} not found in VCF header"))
        };

        let child_idx = sample_idx(&child_id)?;
        let parent_idx = match &self.mode {
            Mode::Solo { .. } => None,
            Mode::Trio {
                parent1_id, parent2_id, ..
            } => Some((sample_idx(parent1_id)?, sample_idx(parent2_id)?)),
        };

        let results: Vec<anyhow::Result<Vec<ReferencePosition>>> = bins
            .par_iter()
            .map(|bin| {
                let parser = CandidateParser::new(self.config, child_idx, parent_idx);
                // Clone the header-ordered table so every bin assigns the same
                // global contig_index to its contig, instead of each bin
                // re-interning from scratch and collapsing every contig to 0.
                let mut bin_table = table.clone();
                let contig_name = bin_table.name_of(bin.contig_index).map(|n| n.to_string()).unwrap_or_default();
                parser.parse_bin(&self.paths.vcf, &contig_name, bin.start, bin.end, &mut bin_table)
            })
            .collect();

        let mut out = Vec::new();
        for r in results {
            match r {
                Ok(mut v) => out.append(&mut v),
                Err(e) => {
                    debug!("bin parse failed: {e:#}");
                }
            }
        }
        Ok(out)
    }

    fn evaluate_one(
        &self,
        candidate: &ReferencePosition,
        child_cache: &PileupCache,
        parent_caches: Option<&(PileupCache, PileupCache)>,
        classifier: &Classifier,
        evaluator: &HaplotypeEvaluator,
    ) -> anyhow::Result<Option<DeNovoResult>> {
        let child_pileup = child_cache.get(&candidate.position)?;
        if !classifier.looks_biallelic(&child_pileup, child_pileup.depth()) {
            return Ok(None);
        }

        let parents = parent_caches.map(|(p1, p2)| (p1, p2));
        let (parent1_pileup, parent2_pileup) = match parents {
            Some((p1, p2)) => (Some(p1.get(&candidate.position)?), Some(p2.get(&candidate.position)?)),
            None => (None, None),
        };

        if !classifier.looks_denovo(child_pileup.depth(), parent1_pileup.as_deref(), parent2_pileup.as_deref()) {
            return Ok(None);
        }

        let parent_depth_ok = match (&parent1_pileup, &parent2_pileup) {
            (Some(p1), Some(p2)) => {
                p1.depth().weighted_biallelic_depth() >= self.config.min_parental_depth
                    && p2.depth().weighted_biallelic_depth() >= self.config.min_parental_depth
            }
            _ => true,
        };
        if !parent_depth_ok {
            return Ok(None);
        }

        let haplotype = evaluator.evaluate(&candidate.position, child_cache, parents)?;

        let child_depth = child_pileup.depth();
        let a1 = child_depth.a1().ok_or_else(|| anyhow::anyhow!("biallelic site missing A1"))?;
        let a2 = child_depth.a2().ok_or_else(|| anyhow::anyhow!("biallelic site missing A2"))?;

        let (child_id, parent1_id, parent2_id) = match &self.mode {
            Mode::Solo { child_id, .. } => (child_id.as_str(), None, None),
            Mode::Trio {
                child_id,
                parent1_id,
                parent2_id,
                ..
            } => (child_id.as_str(), Some(parent1_id.as_str()), Some(parent2_id.as_str())),
        };

        let mut samples = vec![sample_fields(child_id, &child_pileup, &a1, &a2)];
        if let (Some(p1), Some(p1_id)) = (&parent1_pileup, parent1_id) {
            samples.push(sample_fields(p1_id, p1, &a1, &a2));
        }
        if let (Some(p2), Some(p2_id)) = (&parent2_pileup, parent2_id) {
            samples.push(sample_fields(p2_id, p2, &a1, &a2));
        }

        Ok(Some(DeNovoResult {
            reference: candidate.clone(),
            haplotype,
            samples,
        }))
    }
}

fn sample_fields(sample_id: &str, pileup: &crate::pileup::Pileup, a1: &genome::PileAllele, a2: &genome::PileAllele) -> Sample {
    Sample {
        sample_id: sample_id.to_string(),
        weighted_depth_a1: pileup.weighted_depth(a1),
        weighted_depth_a2: pileup.weighted_depth(a2),
        raw_depth_a1: pileup.raw_depth(a1),
        raw_depth_a2: pileup.raw_depth(a2),
        clipped_a1: pileup.clipped_count(a1),
        clipped_a2: pileup.clipped_count(a2),
        apparent_mismap_a1: pileup.apparent_mismap_count(a1),
        apparent_mismap_a2: pileup.apparent_mismap_count(a2),
        unmapped_mate_a1: pileup.unmapped_mate_count(a1),
        unmapped_mate_a2: pileup.unmapped_mate_count(a2),
        end_position_a1: pileup.end_position_count(a1),
        end_position_a2: pileup.end_position_count(a2),
    }
}
