// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the restamp-document crate: line aggregation over
// a page-sized set of synthetic runs, and fallback pagination of a long text.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use restamp_core::EngineConfig;
use restamp_document::PdfWriter;
use restamp_document::geometry::Rect;
use restamp_document::layout::lines::aggregate;
use restamp_document::layout::mapper::map_text;
use restamp_document::pdf::extract::GlyphRun;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 50 lines of four runs each, in the scrambled order a real content stream
/// tends to emit them.
fn synthetic_runs() -> Vec<GlyphRun> {
    let mut runs = Vec::new();
    for column in [3, 0, 2, 1] {
        for row in 0..50 {
            let x = 72.0 + column as f32 * 110.0;
            // Baselines jitter a little within each row.
            let baseline = 740.0 - row as f32 * 14.0 + (column as f32 * 0.3);
            runs.push(GlyphRun {
                page_index: 0,
                bbox: Rect::new(x, x + 100.0, baseline - 2.5, baseline + 8.6),
                baseline,
                font: None,
                font_size: 12.0,
                text: format!("cell {row}:{column}"),
            });
        }
    }
    runs
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_aggregate(c: &mut Criterion) {
    let runs = synthetic_runs();
    c.bench_function("aggregate (200 runs)", |b| {
        b.iter(|| {
            let lines = aggregate(black_box(runs.clone()), 1.5);
            black_box(map_text(lines, "replacement\ntext"));
        });
    });
}

fn bench_paginate(c: &mut Criterion) {
    let text = "- Designed and shipped a layout-preserving document pipeline used by thousands of people\n"
        .repeat(200);
    let writer = PdfWriter::new(612.0, 792.0, &EngineConfig::default());
    c.bench_function("fallback layout (200 bullets)", |b| {
        b.iter(|| black_box(writer.layout(black_box(&text))));
    });
}

criterion_group!(benches, bench_aggregate, bench_paginate);
criterion_main!(benches);
