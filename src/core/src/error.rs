use genome::{ParseBaseError, ParsePositionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PileupError {
    #[error("requested window spans two contigs: {0} != {1}")]
    CrossContigWindow(String, String),

    #[error("failed to fetch region on contig index {0}")]
    FetchFailed(u32),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Pileup(#[from] PileupError),

    #[error("unknown contig name: {0}")]
    UnknownContig(String),
}

#[derive(Error, Debug)]
pub enum CandidateError {
    #[error("reference allele is not a single base: {0:?}")]
    NotSingleBase(Vec<u8>),

    #[error("no single non-reference allele in child genotype")]
    NoAltAllele,

    #[error("candidate allele is longer than one base (indel), rejected")]
    NotSnv,

    #[error(transparent)]
    Position(#[from] ParsePositionError),

    #[error(transparent)]
    BadBase(#[from] ParseBaseError),

    #[error("contig {0} absent from VCF header")]
    UnknownContig(String),
}

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("bad snapshot magic bytes")]
    BadMagic,

    #[error("unsupported snapshot format version {0}, expected {1}")]
    UnsupportedVersion(u16, u16),

    #[error(transparent)]
    Encode(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
