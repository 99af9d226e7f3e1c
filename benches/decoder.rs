//! Decoder hot-path benchmark.
//!
//! Run with: cargo bench --bench decoder

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ldpc_sim::{
    BpDecoder, Channel, ChannelKind, CodeBuilder, DecoderConfig, DegreeDistribution, UpdateRule,
};
use std::sync::Arc;

fn bench_decode(c: &mut Criterion) {
    let code = Arc::new(
        CodeBuilder::new(512, 1024, DegreeDistribution::uniform(3))
            .seed(42)
            .build()
            .expect("code construction"),
    );

    // One noisy frame near the waterfall region, reused for every iteration
    let mut channel = Channel::new(ChannelKind::Awgn, &code, 1);
    channel.set_parameter(1.5).expect("channel parameter");
    channel.simulate();
    channel.compute_llrs();
    let llrs = channel.llrs().to_vec();

    let mut group = c.benchmark_group("bp_decode");
    group.throughput(Throughput::Elements(code.n() as u64));

    for (name, rule) in [
        ("sum_product", UpdateRule::SumProduct),
        ("min_sum", UpdateRule::MinSum { scale: 0.75 }),
    ] {
        let mut decoder = BpDecoder::new(
            Arc::clone(&code),
            DecoderConfig {
                max_iterations: 20,
                early_termination: false,
                update_rule: rule,
            },
        );
        group.bench_function(name, |b| b.iter(|| decoder.decode(black_box(&llrs))));
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
