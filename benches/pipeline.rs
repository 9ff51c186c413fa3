//! Benchmarks for the tilegen pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tilegen::builder::LootObject;
use tilegen::compile::{compile_loot, IdMap};
use tilegen::dsl::{parse_loot, parse_script};
use tilegen::pack::pack_boxes;
use tilegen::Diagnostics;

// -- Parsing benchmarks --

fn section_source(sections: usize) -> String {
    let mut src = String::new();
    for i in 0..sections {
        src.push_str(&format!(
            "[structure thing{i}]\nshape: solid (1, 1, 2)\nlayer: 1\nimage: \"things/{i}.png\"\n\n\
             [item thing{i}]\nfrom_structure: thing{i}\n\n\
             [recipe thing{i}]\nfrom_item: thing{i}\nstation: anvil\ninput: 5 wood\ninput: 2 stone\n\n"
        ));
    }
    src
}

fn loot_source(tables: usize, entries: usize) -> String {
    let mut src = String::new();
    for t in 0..tables {
        src.push_str(&format!("[choose_item table{t}]\n"));
        for e in 0..entries {
            src.push_str(&format!("({}) 1-{} item{}\n", e + 1, e + 1, (t * 7 + e) % 50));
        }
        if t > 0 {
            src.push_str(&format!("*table{}\n", t - 1));
        }
        src.push_str(&format!("[choose_item_ext table{t}]\n(3) item{t}\n\n"));
    }
    src
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    let small = "[block grass]\nshape: floor\nbottom: \"tiles/grass.png\"\n";
    let large = section_source(200);
    let loot = loot_source(50, 10);

    group.bench_function("parse_sections_small", |b| {
        b.iter(|| {
            let mut diags = Diagnostics::new();
            parse_script("bench.od", black_box(small), &mut diags)
        })
    });

    group.bench_function("parse_sections_large", |b| {
        b.iter(|| {
            let mut diags = Diagnostics::new();
            parse_script("bench.od", black_box(&large), &mut diags)
        })
    });

    group.bench_function("parse_loot", |b| {
        b.iter(|| {
            let mut diags = Diagnostics::new();
            parse_loot("bench.loot", black_box(&loot), &mut diags)
        })
    });

    group.finish();
}

// -- Loot compilation --

fn bench_loot(c: &mut Criterion) {
    let mut group = c.benchmark_group("loot");

    let mut diags = Diagnostics::new();
    let defs = parse_loot("bench.loot", &loot_source(100, 10), &mut diags);
    let items = IdMap::from_ordered((0..50).map(|i| format!("item{i}")));

    group.bench_function("compile_100_tables", |b| {
        b.iter(|| {
            let mut diags = Diagnostics::new();
            compile_loot(black_box(&defs), LootObject::Item, &items, &mut diags)
        })
    });

    group.finish();
}

// -- Packing benchmarks --

fn bench_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("packing");

    // Structure-sized boxes, in cells
    let boxes: Vec<(u32, u32)> = (0..300)
        .map(|i| (1 + i % 4, 1 + (i / 4) % 5))
        .collect();
    // Anim strips on a 16-cell page
    let strips: Vec<(u32, u32)> = (0..120).map(|i| (2 + i % 9, 1)).collect();

    group.bench_function("pack_structure_parts", |b| {
        b.iter(|| pack_boxes(black_box(&boxes), (32, 32)).unwrap())
    });

    group.bench_function("pack_anim_strips", |b| {
        b.iter(|| pack_boxes(black_box(&strips), (16, 16)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_parsing, bench_loot, bench_packing);
criterion_main!(benches);
