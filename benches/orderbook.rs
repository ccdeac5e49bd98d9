//! Benchmarks for orderbook and cache operations.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use orderbook_stream::cache::ArrayCache;
use orderbook_stream::orderbook::{BookKind, BookSide, OrderBook, Side};
use orderbook_stream::types::{Delta, Trade};
use rust_decimal::Decimal;

fn populated_side(kind: BookKind, size: i64) -> BookSide {
    let mut side = BookSide::new(Side::Bid, kind, None);
    for i in 1..=size {
        let delta = match kind {
            BookKind::Plain => Delta::new(Decimal::from(i), Decimal::from(100)),
            BookKind::Counted => Delta::counted(Decimal::from(i), Decimal::from(100), 3),
            BookKind::Indexed => Delta::indexed(Some(Decimal::from(i)), Decimal::from(100), i.to_string()),
        };
        let _ = side.store_array(&delta);
    }
    side
}

fn bench_side_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("side_delta");

    for size in [10i64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut side = populated_side(BookKind::Plain, size);
            let mid = Decimal::from(size / 2);

            b.iter(|| {
                // Simulate a typical size change at an existing level
                let _ = side.store(black_box(mid), black_box(Decimal::from(10)));
            });
        });
    }

    group.finish();
}

fn bench_indexed_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("indexed_delta");

    for size in [10i64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut side = populated_side(BookKind::Indexed, size);
            let id = (size / 2).to_string();
            let mut flip = false;

            b.iter(|| {
                // Move one order between two prices
                flip = !flip;
                let price = if flip { Decimal::ONE } else { Decimal::from(size) };
                let _ = side.store_indexed(black_box(Some(price)), Decimal::ONE, id.as_str());
            });
        });
    }

    group.finish();
}

fn bench_best_bid(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook_best_bid");

    for size in [10i64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut book = OrderBook::plain("BENCH");
            let bids: Vec<_> = (1..=size)
                .map(|i| Delta::new(Decimal::from(i), Decimal::from(100)))
                .collect();
            book.update(&bids, &[], None, None);

            b.iter(|| {
                black_box(book.best_bid());
            });
        });
    }

    group.finish();
}

fn bench_spread(c: &mut Criterion) {
    let mut book = OrderBook::plain("BENCH");

    // Set up a realistic book
    let bids: Vec<_> = (1..=50)
        .map(|i| Delta::new(Decimal::from(1000 - i), Decimal::from(i)))
        .collect();
    let asks: Vec<_> = (1..=50)
        .map(|i| Delta::new(Decimal::from(1000 + i), Decimal::from(i)))
        .collect();
    book.update(&bids, &asks, None, None);

    c.bench_function("orderbook_spread", |b| {
        b.iter(|| {
            black_box(book.spread());
        });
    });
}

fn bench_cache_append(c: &mut Criterion) {
    let mut cache = ArrayCache::new(1000);

    c.bench_function("cache_append_full", |b| {
        b.iter(|| {
            cache.append(black_box(Trade::new("BENCH", Decimal::ONE, Decimal::ONE)));
        });
    });
}

criterion_group!(
    benches,
    bench_side_delta,
    bench_indexed_delta,
    bench_best_bid,
    bench_spread,
    bench_cache_append
);
criterion_main!(benches);
