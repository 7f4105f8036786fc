use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    codec::bench_decode_control,
    codec::bench_decode_nested,
    router::bench_route_control,
    router::bench_route_forward
);
criterion_main!(benches);
