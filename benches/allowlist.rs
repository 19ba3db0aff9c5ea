use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use keygate::gate::Allowlist;
use keygate::identity::PublicKeyHex;

fn gen_hex_keys(n: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| hex::encode(rng.gen::<[u8; 32]>())).collect()
}

fn bench_allowlist(c: &mut Criterion) {
    let ns = [10usize, 1_000usize, 10_000usize];
    let mut group = c.benchmark_group("allowlist");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(30);

    for &n in &ns {
        let keys = gen_hex_keys(n, 0xBEEF_CAFE);
        let npubs: Vec<String> = keys.iter().filter_map(|k| PublicKeyHex::parse(k).ok()).map(|k| k.to_npub()).collect();
        let misses = gen_hex_keys(n, 0xDEAD_BEEF);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("build_hex", n.to_string()), &keys, |b, keys| {
            b.iter(|| criterion::black_box(Allowlist::new(true, keys)));
        });

        let list = Allowlist::new(true, &keys);

        // Presented as npub: decode + lookup
        group.bench_with_input(BenchmarkId::new("hit_npub", n.to_string()), &npubs, |b, npubs| {
            b.iter(|| {
                let mut hits = 0usize;
                for k in npubs { if list.is_whitelisted(k) { hits += 1; } }
                criterion::black_box(hits);
            });
        });

        // Presented as uppercase hex
        let upper: Vec<String> = keys.iter().map(|k| k.to_ascii_uppercase()).collect();
        group.bench_with_input(BenchmarkId::new("hit_hex_upper", n.to_string()), &upper, |b, upper| {
            b.iter(|| {
                let mut hits = 0usize;
                for k in upper { if list.is_whitelisted(k) { hits += 1; } }
                criterion::black_box(hits);
            });
        });

        group.bench_with_input(BenchmarkId::new("miss", n.to_string()), &misses, |b, misses| {
            b.iter(|| {
                let mut hits = 0usize;
                for k in misses { if list.is_whitelisted(k) { hits += 1; } }
                criterion::black_box(hits);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_allowlist);
criterion_main!(benches);
