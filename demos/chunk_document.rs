//! Chunk a Document
//!
//! Runs the whole pipeline over a document and prints the chunks and the
//! quality report. With no arguments a built-in sample is used.
//!
//! ```bash
//! cargo run --example chunk_document
//! cargo run --example chunk_document -- document.json figures.json
//! RUST_LOG=quarry=debug cargo run --example chunk_document
//! ```

use std::env;
use std::fs;

use quarry::{BlockKind, ContentBlock, Document, FigureIndex, Pipeline, StructuralSchema};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SAMPLE_FIGURES: &str = r#"[{
    "figure_id": "4.1",
    "caption_block_id": "p0-figure_caption-3",
    "image_path": "images/fig_4_1.png",
    "caption": "Fig. 4.1 Superficial cerebral veins, lateral view."
}]"#;

fn sample_document() -> Document {
    let header = "p0-section_header-0";
    let sub = "p0-section_header-1";
    Document::new("neuroanatomy-ch4")
        .with_page(vec![
            ContentBlock::new(header, BlockKind::SectionHeader, 0, "THE CEREBRAL VEINS"),
            ContentBlock::new(sub, BlockKind::SectionHeader, 0, "Superficial Veins")
                .with_ancestors([header]),
            ContentBlock::new(
                "p0-text-2",
                BlockKind::Text,
                0,
                "The superficial cerebral veins drain the outer cortex. They run in the \
                 subarachnoid space over the surface of the gyri. Most of them empty into \
                 the superior sagittal sinus (Fig. 4.1). The superior anastomotic vein, \
                 also called the vein of Trolard, links the sagittal sinus to the middle \
                 cerebral vein.",
            )
            .with_ancestors([header, sub]),
            ContentBlock::new(
                "p0-figure_caption-3",
                BlockKind::FigureCaption,
                0,
                "Fig. 4.1 Superficial cerebral veins, lateral view.",
            )
            .with_ancestors([header, sub]),
        ])
        .with_page(vec![ContentBlock::new(
            "p1-text-0",
            BlockKind::Text,
            1,
            "The inferior anastomotic vein, the vein of Labbé, runs to the transverse \
             sinus. Together the anastomotic veins give alternative drainage routes \
             when a sinus is obstructed.",
        )
        .with_ancestors([header, sub])])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (document, figures) = match args.as_slice() {
        [] => (sample_document(), FigureIndex::from_json_str(SAMPLE_FIGURES)?),
        [doc] => (Document::from_json_str(&fs::read_to_string(doc)?)?, FigureIndex::default()),
        [doc, figs, ..] => (
            Document::from_json_str(&fs::read_to_string(doc)?)?,
            FigureIndex::from_json_str(&fs::read_to_string(figs)?)?,
        ),
    };

    let mut pipeline = Pipeline::default();
    let (output, report) = pipeline.process(&document, &figures, &StructuralSchema)?;

    println!("Document: {} ({} blocks)", output.document_id, document.chunkable_block_count());
    println!("Chunks: {}\n", output.chunks.len());

    for chunk in &output.chunks {
        println!("{chunk}");
        println!("    {}", chunk.breadcrumb_text);
        if !chunk.figure_references.is_empty() {
            let figures: Vec<&str> = chunk
                .figure_references
                .iter()
                .map(|figure| figure.figure_id.as_str())
                .collect();
            println!("    figures: {}", figures.join(", "));
        }
    }

    println!("\n{report}");
    Ok(())
}
