use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pegel::{CaptureBuffer, Frame, TwoPole};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("TwoPole.process()", |b| {
        let mut filter = TwoPole::default();
        filter.set_low_pass(2.0 * 1_000.0 / 44_100.0);
        filter.clear();

        b.iter(|| filter.process(black_box(0.5)))
    });

    c.bench_function("band + envelope cascade", |b| {
        let mut high_pass = TwoPole::default();
        let mut low_pass = TwoPole::default();
        let mut smooth_a = TwoPole::default();
        let mut smooth_b = TwoPole::default();
        high_pass.set_high_pass(2.0 * 30.0 / 44_100.0);
        low_pass.set_low_pass(2.0 * 1_000.0 / 44_100.0);
        smooth_a.set_low_pass(2.0 * 30.0 / 44_100.0);
        smooth_b.set_low_pass(2.0 * 30.0 / 44_100.0);

        b.iter(|| {
            let band = low_pass.process(high_pass.process(black_box(0.5)));
            smooth_b.process(smooth_a.process(band.abs()).abs()).abs()
        })
    });

    c.bench_function("CaptureBuffer.push()", |b| {
        let mut rb = CaptureBuffer::new();
        b.iter(|| rb.push(black_box(Frame::new(0.25, -0.25))))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
