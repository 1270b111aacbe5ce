//! Benchmarks for snapshot diffing and rule evaluation
//!
//! Synthetic modules with many commands, each with several parameter sets and
//! an output type backed by a chain of catalog entries.

use cmdcompat_core::{
    CommandMetadata, MetadataSnapshot, ParameterMetadata, ParameterSetMetadata, TypeKind,
    TypeMetadata,
};
use cmdcompat_engine::{CmdletDiff, Conventions, RuleEngine};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Generate a module with `num_commands` commands
///
/// With `mandatory` set, every first parameter becomes mandatory so the diff
/// has something to report.
fn generate_module(num_commands: usize, mandatory: bool) -> MetadataSnapshot {
    let mut snapshot = MetadataSnapshot::default();

    for i in 0..num_commands {
        let output = format!("Contoso.Widget{}", i);
        let base = format!("Contoso.WidgetBase{}", i % 10);

        let sets = (0..3).map(|s| {
            let parameters = (0..6)
                .map(|p| {
                    ParameterMetadata::new(format!("Param{}", p), "System.String")
                        .with_position(if p < 2 { p } else { -1 })
                        .with_mandatory(mandatory && p == 0)
                        .with_alias(format!("P{}", p))
                })
                .collect();
            ParameterSetMetadata::new(format!("Set{}", s), parameters)
        });

        let mut command = CommandMetadata::new(format!("Get-Widget{}", i), format!("GetWidget{}Command", i))
            .with_output_type(output.as_str())
            .with_default_parameter_set("Set0");
        for set in sets {
            command = command.with_parameter_set(set);
        }
        snapshot.commands.push(command);

        snapshot = snapshot.with_type(
            TypeMetadata::new(output.as_str(), TypeKind::Class)
                .with_base(base.as_str())
                .with_member("Id", "System.Int32")
                .with_member("Name", "System.String"),
        );
    }

    for b in 0..10 {
        snapshot = snapshot.with_type(TypeMetadata::new(format!("Contoso.WidgetBase{}", b), TypeKind::Class));
    }

    snapshot
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("cmdlet_diff");

    for size in [10, 100, 500] {
        let old = generate_module(size, false);
        let new = generate_module(size, true);

        group.bench_with_input(BenchmarkId::new("identical", size), &size, |b, _| {
            b.iter(|| CmdletDiff::compare(black_box(&old), black_box(&old)))
        });

        group.bench_with_input(BenchmarkId::new("mandatory_flip", size), &size, |b, _| {
            b.iter(|| CmdletDiff::compare(black_box(&old), black_box(&new)))
        });
    }

    group.finish();
}

fn bench_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature_rules");
    let conventions = Conventions::default();
    let engine = RuleEngine::signature();

    for size in [10, 100, 500] {
        let snapshot = generate_module(size, false);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| engine.evaluate(black_box(&snapshot), &conventions))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff, bench_rules);
criterion_main!(benches);
