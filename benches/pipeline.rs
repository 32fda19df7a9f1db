//! Benchmarks for the chunking pipeline and its hot paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use quarry::{
    split_sentences, BlockKind, ContentBlock, Document, FigureIndex, Pipeline, Splitter,
    StructuralSchema, TokenEstimator,
};

fn sample_text(size: usize) -> String {
    let sentences = [
        "The superficial cerebral veins drain the outer cortex. ",
        "They run in the subarachnoid space over the gyri. ",
        "Most empty into the superior sagittal sinus (see Fig. 4.1). ",
        "Bridging veins cross the subdural space, e.g. near the vertex. ",
        "The inferior group drains into the transverse sinus. ",
    ];
    let mut text = String::with_capacity(size);
    let mut i = 0;
    while text.len() < size {
        text.push_str(sentences[i % sentences.len()]);
        i += 1;
    }
    text.truncate(size);
    text
}

/// A document of `sections` sections, each with `paragraphs` blocks of
/// roughly `paragraph_size` bytes.
fn sample_document(sections: usize, paragraphs: usize, paragraph_size: usize) -> Document {
    let mut doc = Document::new("bench");
    for s in 0..sections {
        let header_id = format!("p{s}-section_header-0");
        let mut blocks = vec![ContentBlock::new(
            header_id.as_str(),
            BlockKind::SectionHeader,
            s as u32,
            format!("SECTION {s}"),
        )];
        for p in 0..paragraphs {
            blocks.push(
                ContentBlock::new(
                    format!("p{s}-text-{}", p + 1),
                    BlockKind::Text,
                    s as u32,
                    sample_text(paragraph_size),
                )
                .with_ancestors([header_id.as_str()]),
            );
        }
        doc = doc.with_page(blocks);
    }
    doc
}

fn bench_sentence_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("sentence_split");

    for size in [1_000, 10_000, 100_000] {
        let text = sample_text(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("split_sentences", size), &text, |b, text| {
            b.iter(|| split_sentences(black_box(text)));
        });
    }

    group.finish();
}

fn bench_splitter(c: &mut Criterion) {
    let mut group = c.benchmark_group("splitter");
    let breadcrumb = vec!["THE CEREBRAL VEINS".to_owned()];

    for size in [1_000, 10_000, 100_000] {
        let block = ContentBlock::new("p0-text-1", BlockKind::Text, 0, sample_text(size))
            .with_ancestors(["p0-section_header-0"]);
        let splitter = Splitter::default();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("split", size), &block, |b, block| {
            b.iter(|| {
                let mut tokens = TokenEstimator::default();
                splitter.split(black_box(block), &breadcrumb, &mut tokens)
            });
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let figures = FigureIndex::default();

    for sections in [1, 10, 50] {
        let doc = sample_document(sections, 8, 1_500);
        let bytes: usize = doc.blocks().map(|block| block.content.len()).sum();

        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::new("run", sections), &doc, |b, doc| {
            let mut pipeline = Pipeline::default();
            b.iter(|| pipeline.run(black_box(doc), &figures));
        });
        group.bench_with_input(BenchmarkId::new("process", sections), &doc, |b, doc| {
            let mut pipeline = Pipeline::default();
            b.iter(|| pipeline.process(black_box(doc), &figures, &StructuralSchema));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sentence_split, bench_splitter, bench_pipeline);
criterion_main!(benches);
