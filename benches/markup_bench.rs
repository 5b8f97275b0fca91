use criterion::{Criterion, black_box, criterion_group, criterion_main};
use markup::{Flow, Handler, Parser, ParserOptions};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

fn make_blocks(blocks: usize) -> String {
    let mut input = String::with_capacity(blocks * 52);
    for _ in 0..blocks {
        input.push_str("<div class=box><span>hello</span><img src=x></div>");
    }
    input
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri");
        body.push('<');
        body.push_str("pt");
    }
    body.push_str("</script>");
    body
}

fn make_entity_heavy(blocks: usize) -> String {
    let mut input = String::with_capacity(blocks * 40);
    for _ in 0..blocks {
        input.push_str("<p title=\"a&amp;b\">x &lt; y &#x41; &notin;</p>");
    }
    input
}

#[derive(Default)]
struct CountingHandler {
    events: u64,
}

impl Handler for CountingHandler {
    fn on_open_tag(&mut self, _name: &str, _attributes: &[(String, String)]) -> Flow {
        self.events += 1;
        Flow::Continue
    }
    fn on_close_tag(&mut self, _name: &str) -> Flow {
        self.events += 1;
        Flow::Continue
    }
    fn on_text(&mut self, _text: &str) -> Flow {
        self.events += 1;
        Flow::Continue
    }
}

fn parse_counting(input: &str) -> u64 {
    let mut parser = Parser::new(CountingHandler::default(), ParserOptions::default());
    parser.write(input);
    parser.end();
    parser.into_handler().events
}

fn bench_parse_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_parse_small", |b| {
        b.iter(|| black_box(parse_counting(black_box(&input))));
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_parse_large", |b| {
        b.iter(|| black_box(parse_counting(black_box(&input))));
    });
}

fn bench_parse_rawtext_adversarial(c: &mut Criterion) {
    let input = make_rawtext_adversarial(512 * 1024);
    c.bench_function("bench_parse_rawtext_adversarial", |b| {
        b.iter(|| black_box(parse_counting(black_box(&input))));
    });
}

fn bench_parse_entities(c: &mut Criterion) {
    let input = make_entity_heavy(4_000);
    c.bench_function("bench_parse_entities", |b| {
        b.iter(|| black_box(parse_counting(black_box(&input))));
    });
}

fn bench_parse_chunked(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_parse_chunked", |b| {
        b.iter(|| {
            let mut parser =
                Parser::new(CountingHandler::default(), ParserOptions::default());
            for chunk in input.as_bytes().chunks(4096) {
                parser.write(std::str::from_utf8(chunk).expect("ascii input"));
            }
            parser.end();
            black_box(parser.into_handler().events)
        });
    });
}

criterion_group!(
    benches,
    bench_parse_small,
    bench_parse_large,
    bench_parse_rawtext_adversarial,
    bench_parse_entities,
    bench_parse_chunked
);
criterion_main!(benches);
