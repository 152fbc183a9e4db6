use criterion::{black_box, criterion_group, criterion_main, Criterion};
use genome::{Base, ContigTable, Phred, PileAllele, Position};
use supernovo_core::pileup::PileupBuilder;
use supernovo_core::read::{ReadId, ReadObservation};

fn synthetic_observations(n: usize) -> Vec<ReadObservation> {
    (0..n)
        .map(|i| {
            let allele = if i % 2 == 0 { Base::A } else { Base::G };
            ReadObservation {
                read_id: ReadId::new(format!("read{i}").as_bytes(), true, 0),
                allele: PileAllele::from(allele),
                base_quality: Phred::new(30),
                mapping_quality: Phred::new(60),
                clipped: i % 97 == 0,
                apparent_mismap: false,
                mate_unmapped: false,
                end_position: i == 0 || i == n - 1,
            }
        })
        .collect()
}

/// Fold observations one at a time into a fresh builder.
fn build_sequential(observations: &[ReadObservation], position: genome::GenomePosition) -> usize {
    let mut builder = PileupBuilder::new();
    for obs in observations {
        builder.add(obs);
    }
    builder.build(position).total_raw_depth()
}

/// Pre-group observations by allele before folding, trading an extra pass
/// for fewer hash-map probes against the (usually tiny) allele set.
fn build_grouped(observations: &[ReadObservation], position: genome::GenomePosition) -> usize {
    use std::collections::HashMap;
    let mut groups: HashMap<PileAllele, Vec<&ReadObservation>> = HashMap::new();
    for obs in observations {
        groups.entry(obs.allele).or_default().push(obs);
    }
    let mut builder = PileupBuilder::new();
    for (_, group) in groups {
        for obs in group {
            builder.add(obs);
        }
    }
    builder.build(position).total_raw_depth()
}

fn bench_pileup_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("pileup");
    let observations = synthetic_observations(5000);
    let position = ContigTable::new().position("chr1", Position(752_566));

    group.sample_size(500);

    group.bench_function("sequential", |b| {
        b.iter(|| build_sequential(black_box(&observations), black_box(position.clone())))
    });

    group.bench_function("grouped_by_allele", |b| {
        b.iter(|| build_grouped(black_box(&observations), black_box(position.clone())))
    });

    group.finish();
}

criterion_group!(benches, bench_pileup_build);
criterion_main!(benches);
