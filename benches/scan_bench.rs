use criterion::{Criterion, black_box, criterion_group, criterion_main};
use htmlscan::{TagOrder, TagScanner, get_element_by_class, get_elements_text_and_html_by_tag};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

fn make_blocks(blocks: usize) -> String {
    let block = r#"<div class="box"><span>hello</span><img src="x"></div>"#;
    let mut input = String::with_capacity(blocks * block.len());
    for _ in 0..blocks {
        input.push_str(block);
    }
    input
}

fn bench_taglist_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    let scanner = TagScanner::default();
    c.bench_function("bench_taglist_small", |b| {
        b.iter(|| {
            let tags = scanner
                .taglist(black_box(&input), TagOrder::Opened)
                .unwrap();
            black_box(tags.len());
        });
    });
}

fn bench_taglist_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let scanner = TagScanner::default();
    c.bench_function("bench_taglist_large", |b| {
        b.iter(|| {
            let tags = scanner
                .taglist(black_box(&input), TagOrder::Opened)
                .unwrap();
            black_box(tags.len());
        });
    });
}

fn bench_get_element_by_class(c: &mut Criterion) {
    let mut input = make_blocks(LARGE_BLOCKS);
    input.push_str(r#"<div class="needle">found</div>"#);
    c.bench_function("bench_get_element_by_class", |b| {
        b.iter(|| {
            let found = get_element_by_class("needle", black_box(&input));
            black_box(found);
        });
    });
}

fn bench_tag_query_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_tag_query_large", |b| {
        b.iter(|| {
            let found = get_elements_text_and_html_by_tag("span", black_box(&input));
            black_box(found.len());
        });
    });
}

criterion_group!(
    benches,
    bench_taglist_small,
    bench_taglist_large,
    bench_get_element_by_class,
    bench_tag_query_large
);
criterion_main!(benches);
