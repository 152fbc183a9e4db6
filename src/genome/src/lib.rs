pub mod position;
pub use position::{ParsePositionError, Position};

pub mod allele;
pub use allele::{Base, ParseBaseError, PileAllele};

pub mod phred;
pub use phred::Phred;

mod contig;
pub use contig::{ContigTable, GenomePosition};
