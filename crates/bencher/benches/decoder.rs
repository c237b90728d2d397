use std::hint::black_box;

use bencher::{TestBody, TestCase};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use micro_form::{FormConfig, FormContent, FormDecoder};

fn create_urlencoded_cases() -> Vec<TestCase> {
    vec![TestCase::small("urlencoded_10_fields", TestBody::urlencoded(10)), TestCase::large("urlencoded_2000_fields", TestBody::urlencoded(2000))]
}

fn create_multipart_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("multipart_small_file", TestBody::multipart(4, 1024)),
        TestCase::normal("multipart_many_fields", TestBody::multipart(200, 1024)),
        TestCase::large("multipart_large_file", TestBody::multipart(4, 512 * 1024)),
    ]
}

fn run_cases(criterion: &mut Criterion, group_name: &str, test_cases: Vec<TestCase>) {
    // keep every upload in memory so the numbers measure parsing, not the file system
    let decoder = FormDecoder::new(FormConfig::new().spool_threshold(usize::MAX));
    let mut group = criterion.benchmark_group(group_name);

    for case in test_cases {
        let content = FormContent::from_header(case.content_type());
        group.throughput(Throughput::Bytes(case.body().content().len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter(|| {
                let data = decoder.decode(&content, black_box(case.body().content())).expect("benchmark body should be a valid form");
                black_box(data);
            });
        });
    }

    group.finish();
}

fn benchmark_urlencoded_decoder(criterion: &mut Criterion) {
    run_cases(criterion, "urlencoded_decoder", create_urlencoded_cases());
}

fn benchmark_multipart_decoder(criterion: &mut Criterion) {
    run_cases(criterion, "multipart_decoder", create_multipart_cases());
}

criterion_group!(decoder, benchmark_urlencoded_decoder, benchmark_multipart_decoder);
criterion_main!(decoder);
