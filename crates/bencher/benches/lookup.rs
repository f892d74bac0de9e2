use std::hint::black_box;

use bencher::{RouteTable, API_ROUTES, STATIC_ROUTES};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stagemux::{
    handler_fn, BoxError, CanonicalRequest, CanonicalResponse, Method, PathParams, PathTrie, Router, TransportMode,
    TrieOptions,
};

fn trie(table: &RouteTable) -> PathTrie<usize> {
    let mut trie = PathTrie::new(TrieOptions::default());
    for (index, pattern) in table.patterns().iter().enumerate() {
        trie.insert(Method::Get, pattern, index).expect("bench routes should be valid");
    }
    trie
}

async fn noop(_req: CanonicalRequest, _params: PathParams) -> Result<CanonicalResponse, BoxError> {
    Ok(CanonicalResponse::ok(""))
}

fn router(table: &RouteTable) -> Router {
    let mut router = Router::builder().transport(TransportMode::Invocation { authorizer_only: false }).build();
    let mut routes = router.routes();
    for pattern in table.patterns() {
        routes.get(pattern, handler_fn(noop)).expect("bench routes should be valid");
    }
    router
}

fn benchmark_trie_search(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("trie_search");

    for table in [STATIC_ROUTES, API_ROUTES] {
        let trie = trie(&table);
        group.throughput(Throughput::Elements(table.paths().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(table.name()), &table, |b, table| {
            b.iter(|| {
                for path in table.paths() {
                    black_box(trie.search(Method::Get, black_box(path)).map(|found| found.params().len()));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_router_lookup(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("router_lookup");

    for table in [STATIC_ROUTES, API_ROUTES] {
        let router = router(&table);
        let requests: Vec<_> = table.paths().iter().map(|path| CanonicalRequest::new(Method::Get, *path)).collect();
        group.throughput(Throughput::Elements(requests.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(table.name()), &requests, |b, requests| {
            b.iter(|| {
                for req in requests {
                    black_box(router.lookup(black_box(req)).status_code());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(lookup, benchmark_trie_search, benchmark_router_lookup);
criterion_main!(lookup);
