//! Benchmarks for document reconstruction.
//!
//! Run with: cargo bench
//!
//! These benchmarks rebuild synthetic block streams of growing size.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blockdoc::model::Block;
use blockdoc::provider::ResultPage;
use blockdoc::{BuildOptions, DocumentBuilder};

/// Creates a block stream with `page_count` pages, each holding 40 lines of
/// 8 words and a 10x4 table.
fn create_test_stream(page_count: usize) -> Vec<Block> {
    let mut blocks = Vec::new();

    for p in 0..page_count {
        let page_id = format!("p{}", p);
        let table_id = format!("p{}-t", p);
        let line_ids: Vec<String> = (0..40).map(|l| format!("p{}-l{}", p, l)).collect();

        let mut children = line_ids.clone();
        children.push(table_id.clone());
        blocks.push(Block::page(page_id, p as u32 + 1).with_children(children));

        for line_id in &line_ids {
            let word_ids: Vec<String> = (0..8).map(|w| format!("{}-w{}", line_id, w)).collect();
            blocks.push(Block::line(line_id.clone(), "benchmark line").with_children(word_ids.clone()));
            for word_id in word_ids {
                blocks.push(Block::word(word_id, "word"));
            }
        }

        let mut cell_ids = Vec::new();
        let mut cells = Vec::new();
        for r in 1..=10 {
            for c in 1..=4 {
                let cell_id = format!("{}-c{}-{}", table_id, r, c);
                let word_id = format!("{}-w", cell_id);
                cells.push(Block::cell(cell_id.clone(), r, c).with_children([word_id.clone()]));
                cells.push(Block::word(word_id, format!("r{}c{}", r, c)));
                cell_ids.push(cell_id);
            }
        }
        // Reverse so row/column ordering does real work
        cell_ids.reverse();
        blocks.push(Block::table(table_id).with_children(cell_ids));
        blocks.extend(cells);
    }

    blocks
}

/// Benchmark reconstruction at various sizes.
fn bench_document_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_build");

    for page_count in [1, 10, 50].iter() {
        let blocks = create_test_stream(*page_count);

        group.bench_function(format!("{}_pages_parallel", page_count), |b| {
            let builder = DocumentBuilder::with_options(BuildOptions::new().with_block_counts(false));
            b.iter(|| builder.build(black_box(blocks.clone())).unwrap());
        });

        group.bench_function(format!("{}_pages_sequential", page_count), |b| {
            let options = BuildOptions::new().sequential().with_block_counts(false);
            let builder = DocumentBuilder::with_options(options);
            b.iter(|| builder.build(black_box(blocks.clone())).unwrap());
        });
    }

    group.finish();
}

/// Benchmark fragment merging.
fn bench_fragment_merge(c: &mut Criterion) {
    let blocks = create_test_stream(10);
    let fragments: Vec<ResultPage> = blocks
        .chunks(1000)
        .map(|chunk| ResultPage::new(chunk.to_vec()))
        .collect();

    c.bench_function("merge_and_build_10_pages", |b| {
        let builder = DocumentBuilder::with_options(BuildOptions::new().with_block_counts(false));
        b.iter(|| builder.build_pages(black_box(fragments.clone())).unwrap());
    });
}

criterion_group!(benches, bench_document_build, bench_fragment_merge);
criterion_main!(benches);
