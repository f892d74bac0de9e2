use std::hint::black_box;

use bencher::RequestFile;
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use stagemux_http::codec::RequestDecoder;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::Decoder;

static SMALL_GET: RequestFile = RequestFile::new("get_small", include_str!("../resources/request/get_small.txt"));
static CHUNKED_POST: RequestFile = RequestFile::new("post_chunked", include_str!("../resources/request/post_chunked.txt"));

fn benchmark_request_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("request_decoder");

    for file in [SMALL_GET, CHUNKED_POST] {
        group.throughput(Throughput::Bytes(file.content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(file.name()), &file, |b, file| {
            let mut request_decoder = RequestDecoder::new();
            b.iter_batched_ref(
                || BytesMut::from(file.content()),
                |bytes_mut| {
                    let head = request_decoder.decode(bytes_mut).expect("input should be a valid request head").unwrap();
                    let body = request_decoder.decode(bytes_mut).expect("input should have a valid body").unwrap();
                    black_box((head, body));
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(decoder, benchmark_request_decoder);
criterion_main!(decoder);
