use std::fmt::Write as _;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use prms_core::{LoadOptions, ParamFile};

/// Synthetic file with `nparams` parameters over `nhru` units, alternating
/// expanded float columns and run-length integer columns.
fn synthetic_param_file(nparams: usize, nhru: usize) -> String {
    let mut text = String::from("synthetic benchmark basin\n** Dimensions **\n####\nnhru\n");
    let _ = writeln!(text, "{nhru}");
    text.push_str("** Parameters **\n");
    for index in 0..nparams {
        let _ = writeln!(text, "####\nparam_{index:04}\n1\nnhru\n{nhru}");
        if index % 2 == 0 {
            text.push_str("2\n");
            for unit in 0..nhru {
                let _ = writeln!(text, "{}", unit as f64 * 0.125 + index as f64);
            }
        } else {
            text.push_str("1\n");
            let half = nhru / 2;
            let _ = writeln!(text, "{half}*1\n{}*0", nhru - half);
        }
    }
    text
}

fn bench_param_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("param_file_parse");

    for nhru in [128usize, 1024, 8192] {
        let text = synthetic_param_file(40, nhru);

        group.bench_with_input(BenchmarkId::new("full", nhru), &text, |b, text| {
            b.iter(|| {
                ParamFile::read_from(
                    Cursor::new(text.as_bytes()),
                    "bench.param",
                    &LoadOptions::default(),
                )
                .expect("synthetic file parses")
            });
        });

        let only_last = LoadOptions::default().only(["param_0039"]);
        group.bench_with_input(BenchmarkId::new("load_only_last", nhru), &text, |b, text| {
            b.iter(|| {
                ParamFile::read_from(Cursor::new(text.as_bytes()), "bench.param", &only_last)
                    .expect("synthetic file parses")
            });
        });
    }

    group.finish();
}

criterion_group!(parse_benches, bench_param_parse);
criterion_main!(parse_benches);
