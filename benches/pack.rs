use astc_endpoints::{
    pack_color_endpoints, ColorQuantTables, EndpointFormat, Vec4, QUANT_RANGES,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

fn ranged_tables() -> ColorQuantTables {
    ColorQuantTables::from_fn(
        |level, v| {
            let max = (QUANT_RANGES[level] - 1) as f32;
            (v as f32 / 255.0 * max + 0.5) as u8
        },
        |level, q| {
            let max = QUANT_RANGES[level] - 1;
            ((q as u16).min(max) as f32 / max as f32 * 255.0 + 0.5) as u8
        },
    )
}

fn random_colors(count: usize) -> Vec<(Vec4, Vec4)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut color = || {
                Vec4::new(
                    rng.gen_range(0.0..65536.0),
                    rng.gen_range(0.0..65536.0),
                    rng.gen_range(0.0..65536.0),
                    rng.gen_range(0.0..65536.0),
                )
            };
            (color(), color())
        })
        .collect()
}

fn bench_format(
    c: &mut Criterion,
    format: EndpointFormat,
    quant_level: usize,
    tables: &ColorQuantTables,
    pairs: &[(Vec4, Vec4)],
) {
    let name = format!("{format:?} @ level {quant_level}");
    c.bench_function(&name, |b| {
        b.iter(|| {
            let mut output = [0u8; 8];
            for &(c0, c1) in pairs {
                let chosen = pack_color_endpoints(
                    black_box(c0),
                    black_box(c1),
                    black_box(c0),
                    black_box(c1),
                    format,
                    &mut output,
                    quant_level,
                    tables,
                );
                black_box((chosen, &output));
            }
        });
    });
}

pub fn pack_endpoints(c: &mut Criterion) {
    let tables = ranged_tables();
    let pairs = random_colors(1024);

    for quant_level in [10, 20] {
        bench_format(c, EndpointFormat::Rgb, quant_level, &tables, &pairs);
        bench_format(c, EndpointFormat::Rgba, quant_level, &tables, &pairs);
        bench_format(c, EndpointFormat::LuminanceAlpha, quant_level, &tables, &pairs);
        bench_format(c, EndpointFormat::HdrRgb, quant_level, &tables, &pairs);
        bench_format(c, EndpointFormat::HdrRgbScale, quant_level, &tables, &pairs);
    }
}

criterion_group!(benches, pack_endpoints);
criterion_main!(benches);
