use cc_parser::{parse_sections, reconstruct, MarkdownParser};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

fn generate_markdown(size_kb: usize) -> String {
    let sentences = [
        "Deployed the gateway to 10.0.1.1 after the config review.",
        "Memory files live under /home/user/workspace/memory.",
        "Decision: keep the nightly compaction job.",
        "这是一个测试句子。",
    ];
    let mut rng = rand::thread_rng();
    let mut md = String::with_capacity(size_kb * 1024);
    let mut section = 0;
    while md.len() < size_kb * 1024 {
        let level = rng.gen_range(1..=3);
        md.push_str(&format!("{} Section {}\n\n", "#".repeat(level), section));
        for _ in 0..rng.gen_range(1..6) {
            md.push_str("- ");
            md.push_str(sentences[rng.gen_range(0..sentences.len())]);
            md.push('\n');
        }
        if section % 7 == 0 {
            md.push_str("```\n# not a heading\n```\n");
        }
        md.push('\n');
        section += 1;
    }
    md
}

fn bench_parse(c: &mut Criterion) {
    let md_10k = generate_markdown(10);
    let md_100k = generate_markdown(100);
    let parser = MarkdownParser::new();
    c.bench_function("parse_markdown_10kb", |b| {
        b.iter(|| black_box(parser.parse(black_box(&md_10k))))
    });
    c.bench_function("parse_markdown_100kb", |b| {
        b.iter(|| black_box(parser.parse(black_box(&md_100k))))
    });
    let sections = parse_sections(&md_100k);
    c.bench_function("reconstruct_100kb", |b| {
        b.iter(|| black_box(reconstruct(black_box(&sections))))
    });
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
