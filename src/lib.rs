use std::path::PathBuf;

use clap::Parser;
use supernovo_core::{Config, Mode, Orchestrator, OrchestratorPaths};

/// Putative de novo SNV caller: weighted pileups, parental-miscall
/// classification and haplotype-concordance analysis for trio/solo
/// samples. Argument parsing is a thin wire onto `supernovo-core`; every
/// interesting decision lives there (see `supernovo-core::orchestrator`).
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Candidate variant file (indexed VCF/gVCF).
    #[arg(long)]
    pub vcf: PathBuf,

    /// Child sample's indexed BAM/CRAM.
    #[arg(long = "childBam")]
    pub child_bam: PathBuf,

    /// Child sample id (must match a VCF sample column).
    #[arg(long = "childID")]
    pub child_id: String,

    /// Parent 1 indexed BAM/CRAM. Requires `--parent1ID`; mutually
    /// exclusive with `--solo`.
    #[arg(long = "parent1Bam", requires = "parent1_id", conflicts_with = "solo")]
    pub parent1_bam: Option<PathBuf>,
    #[arg(long = "parent1ID")]
    pub parent1_id: Option<String>,

    /// Parent 2 indexed BAM/CRAM. Requires `--parent2ID`; mutually
    /// exclusive with `--solo`.
    #[arg(long = "parent2Bam", requires = "parent2_id", conflicts_with = "solo")]
    pub parent2_bam: Option<PathBuf>,
    #[arg(long = "parent2ID")]
    pub parent2_id: Option<String>,

    /// Evaluate the child alone; mutually exclusive with trio mode.
    #[arg(long)]
    pub solo: bool,

    /// Output path stem for the tab-delimited result file and its siblings.
    #[arg(long)]
    pub output: PathBuf,

    /// Genome build tag, passed through to the annotator.
    #[arg(long, default_value = "GRCh38")]
    pub genome: String,

    /// Optional SnpEff database path (annotator collaborator).
    #[arg(long = "snpEff")]
    pub snp_eff: Option<PathBuf>,

    /// Optional Annovar database directory (annotator collaborator).
    #[arg(long = "annovarDir")]
    pub annovar_dir: Option<PathBuf>,

    #[command(flatten)]
    pub thresholds: Thresholds,

    /// Verbosity: repeat for more (-v, -vv, -vvv...).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
pub struct Thresholds {
    #[arg(long, default_value_t = 10.0)]
    pub min_depth: f64,
    #[arg(long, default_value_t = 4)]
    pub min_allelic_depth: usize,
    #[arg(long, default_value_t = 0.10)]
    pub min_allelic_frac: f64,
    #[arg(long, default_value_t = 0.05)]
    pub max_miscall_frac: f64,
    #[arg(long, default_value_t = 1.0)]
    pub max_miscall_weight: f64,
    #[arg(long, default_value_t = 4)]
    pub vcf_max_parent_ad: i32,
    #[arg(long, default_value_t = 10.0)]
    pub min_parental_depth: f64,
    #[arg(long, default_value_t = 1.5)]
    pub min_other_dn_allelic_depth: f64,
    #[arg(long, default_value_t = 3.0)]
    pub min_other_dn_allelic_depth_independent: f64,
    #[arg(long, default_value_t = 0.75)]
    pub min_haplotype_concordance: f64,
    #[arg(long, default_value_t = 150)]
    pub haplotype_search_distance: u32,
}

impl From<Thresholds> for Config {
    fn from(t: Thresholds) -> Self {
        Config {
            min_depth: t.min_depth,
            min_allelic_depth: t.min_allelic_depth,
            min_allelic_frac: t.min_allelic_frac,
            max_miscall_frac: t.max_miscall_frac,
            max_miscall_weight: t.max_miscall_weight,
            vcf_max_parent_ad: t.vcf_max_parent_ad,
            min_parental_depth: t.min_parental_depth,
            min_other_dn_allelic_depth: t.min_other_dn_allelic_depth,
            min_other_dn_allelic_depth_independent: t.min_other_dn_allelic_depth_independent,
            min_haplotype_concordance: t.min_haplotype_concordance,
            haplotype_search_distance: t.haplotype_search_distance,
        }
    }
}

fn mode_from_args(args: &Args) -> anyhow::Result<Mode> {
    if args.solo {
        return Ok(Mode::Solo {
            child_bam: args.child_bam.clone(),
            child_id: args.child_id.clone(),
        });
    }
    let (Some(parent1_bam), Some(parent1_id), Some(parent2_bam), Some(parent2_id)) =
        (&args.parent1_bam, &args.parent1_id, &args.parent2_bam, &args.parent2_id)
    else {
        anyhow::bail!("trio mode requires --parent1Bam/--parent1ID and --parent2Bam/--parent2ID, or pass --solo");
    };
    Ok(Mode::Trio {
        child_bam: args.child_bam.clone(),
        child_id: args.child_id.clone(),
        parent1_bam: parent1_bam.clone(),
        parent1_id: parent1_id.clone(),
        parent2_bam: parent2_bam.clone(),
        parent2_id: parent2_id.clone(),
    })
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let mode = mode_from_args(&args)?;
    let config: Config = args.thresholds.into();
    let paths = OrchestratorPaths {
        vcf: args.vcf.clone(),
        output: args.output.clone(),
    };

    let orchestrator = Orchestrator::new(&config, mode, paths, args.genome.clone());
    let checkpoint_path = {
        let mut p = args.output.clone().into_os_string();
        p.push(".SuperNovoResultList.ser.gz_CHUNKED");
        PathBuf::from(p)
    };

    let annotator = supernovo_core::annotate::NoopAnnotator;
    let writer = supernovo_core::writer::TsvWriter;

    let count = orchestrator.run(&annotator, &writer, &checkpoint_path)?;
    log::info!("wrote {count} SuperNovo calls to {}", args.output.display());
    Ok(())
}
