use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use treeq::model::builder::{NodeBuilder, alias, anchor, map, seq};
use treeq::{
    CandidateNode, Context, DocumentDecoder, EngineConfig, Navigator, NodeTree, YamlDecoder, compile,
    parse_expression,
};

fn sample_queries() -> Vec<&'static str> {
    vec![
        ".items[] | .name",
        ".items[] | select(.kind == \"b\") | .id",
        ".defaults.*",
        ".items[] | .settings.retries",
        "[.items[].kind] | unique",
        ".items[] | {id: .id, kind: .kind}",
        "..",
    ]
}

fn build_sample_document() -> NodeBuilder {
    let mut items = seq();
    for i in 0..200 {
        items = items.item(
            map()
                .entry("id", i)
                .entry("name", format!("item-{i}"))
                .entry("kind", if i % 3 == 0 { "a" } else { "b" })
                .entry("settings", map().merge(alias("defaults")).entry("timeout", i * 10)),
        );
    }
    map()
        .entry("defaults", anchor("defaults", map().entry("retries", 3).entry("timeout", 30)))
        .entry("items", items)
}

fn benchmark_parser(c: &mut Criterion) {
    let queries = sample_queries();
    c.bench_function("parser/parse_expression", |b| {
        b.iter(|| {
            for q in &queries {
                let ast = parse_expression(black_box(q)).expect("parse failure");
                black_box(ast);
            }
        })
    });
}

fn benchmark_compiler(c: &mut Criterion) {
    let queries = sample_queries();
    c.bench_function("compiler/compile", |b| {
        b.iter(|| {
            for q in &queries {
                let compiled = compile(black_box(q)).expect("compile failure");
                black_box(compiled);
            }
        })
    });
}

fn benchmark_evaluator(c: &mut Criterion) {
    let document = build_sample_document();
    let compiled: Vec<_> = sample_queries()
        .into_iter()
        .map(|q| (q, compile(q).expect("compile failure")))
        .collect();
    let mut navigator = Navigator::new(EngineConfig::default());

    let mut group = c.benchmark_group("navigator/evaluate");
    for (name, expr) in &compiled {
        group.bench_with_input(BenchmarkId::from_parameter(name), expr, |b, expr| {
            b.iter(|| {
                let mut tree = NodeTree::new();
                let root = document.build_document(&mut tree);
                let ctx = Context::new(vec![CandidateNode::root(root, 0, 0)]);
                let result = navigator.evaluate(&mut tree, black_box(&ctx), expr).expect("eval failure");
                black_box(result.len());
            });
        });
    }
    group.finish();
}

fn benchmark_decoder(c: &mut Criterion) {
    let mut text = String::from("defaults: &d {retries: 3}\nitems:\n");
    for i in 0..500 {
        text.push_str(&format!("  - {{id: {i}, name: item-{i}, settings: {{<<: *d, timeout: {i}}}}}\n"));
    }
    c.bench_function("codec/yaml_decode", |b| {
        b.iter(|| {
            for doc in YamlDecoder.decode(black_box(text.as_bytes())) {
                black_box(doc.expect("decode failure").tree.len());
            }
        })
    });
}

criterion_group!(benches, benchmark_parser, benchmark_compiler, benchmark_evaluator, benchmark_decoder);
criterion_main!(benches);
