//! Benchmarks for registry parsing, serialization, and descriptor rendering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use known_good::generator::{plan_artifacts, GenerateOptions};
use known_good::registry;

/// Build a registry with `groups` groups of `modules` modules each.
///
/// Modules alternate between version and commit pins; every third one lists
/// `rust` so the coverage file is rendered too.
fn generate_registry(groups: usize, modules: usize) -> String {
    let mut group_entries = Vec::with_capacity(groups);
    for g in 0..groups {
        let name = if g == 0 {
            "target_sw".to_string()
        } else {
            format!("group_{}", g)
        };
        let mut module_entries = Vec::with_capacity(modules);
        for m in 0..modules {
            let pin = if m % 2 == 0 {
                format!("\"version\": \"1.{}.0\"", m)
            } else {
                format!("\"hash\": \"{:040x}\"", g * 1000 + m)
            };
            let langs = if m % 3 == 0 { "\"rust\"" } else { "\"cpp\"" };
            module_entries.push(format!(
                "\"module_{g}_{m}\": {{\"repo\": \"https://github.com/org/module_{g}_{m}.git\", {pin}, \"metadata\": {{\"langs\": [{langs}]}}}}",
                g = g,
                m = m,
                pin = pin,
                langs = langs,
            ));
        }
        group_entries.push(format!("\"{}\": {{{}}}", name, module_entries.join(", ")));
    }
    format!(
        "{{\"modules\": {{{}}}, \"timestamp\": \"2026-01-01T00:00:00+00:00\"}}",
        group_entries.join(", ")
    )
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_parsing");

    for modules in [5, 20, 100] {
        let text = generate_registry(3, modules);
        group.bench_with_input(BenchmarkId::new("modules", modules), &text, |b, text| {
            b.iter(|| registry::parse(black_box(text)))
        });
    }

    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let parsed = registry::parse(&generate_registry(3, 50)).expect("registry parses");

    c.bench_function("registry_serialize", |b| {
        b.iter(|| registry::serialize(black_box(&parsed)))
    });
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptor_render");
    let options = GenerateOptions::new("bazel_common", "rust_coverage");

    for groups in [1, 5, 10] {
        let parsed = registry::parse(&generate_registry(groups, 20)).expect("registry parses");
        group.bench_with_input(BenchmarkId::new("groups", groups), &parsed, |b, parsed| {
            b.iter(|| plan_artifacts(black_box(parsed), &options))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_serialize, bench_render);
criterion_main!(benches);
