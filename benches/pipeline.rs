use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use mboxgrams::decode::tokenize::Tokenizer;
use mboxgrams::stats::NgramCounter;
use mboxgrams::walker::{walk_mailboxes, WalkOptions};

fn bench_walk_fixtures(c: &mut Criterion) {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures");
    let paths = vec![
        fixtures.join("two_messages.mbox"),
        fixtures.join("multipart.mbox"),
        fixtures.join("isolation.mbox"),
    ];
    let options = WalkOptions::default();

    c.bench_function("walk_fixture_mailboxes", |b| {
        b.iter(|| {
            let mut counter = NgramCounter::new();
            walk_mailboxes(&paths, &options, &mut counter, None).unwrap();
            counter
        })
    });
}

fn bench_tokenize(c: &mut Criterion) {
    let text = "Dr. Smith met Mr. Jones at 10 a.m. on Monday. They didn't agree, \
                e.g. on the budget! Was anyone surprised? Not really.\n"
        .repeat(200);
    let tokenizer = Tokenizer::default();

    c.bench_function("tokenize_and_count", |b| {
        b.iter(|| {
            let mut counter = NgramCounter::new();
            for sentence in tokenizer.sentences(&text) {
                counter.add_sentence(&sentence);
            }
            counter
        })
    });
}

criterion_group!(benches, bench_walk_fixtures, bench_tokenize);
criterion_main!(benches);
