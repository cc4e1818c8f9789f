use base64::{engine::general_purpose, Engine as _};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::fs;
use wasmload::parser::encoding::*;
use wasmload::parser::{self, Parser, ParserConfig};

fn load_fixture_modules() -> Vec<(String, Vec<u8>)> {
    let json = fs::read_to_string("tests/fixtures/modules.json").expect("Failed to read fixtures");
    let fixtures: serde_json::Value = serde_json::from_str(&json).expect("Failed to parse JSON");
    fixtures
        .as_array()
        .expect("Fixtures are not an array")
        .iter()
        .filter(|f| f["expect"].get("ok").is_some())
        .map(|f| {
            let name = f["name"].as_str().unwrap_or_default().to_string();
            let wasm = general_purpose::STANDARD
                .decode(f["wasm"].as_str().expect("Fixture without wasm"))
                .expect("Failed to decode base64");
            (name, wasm)
        })
        .collect()
}

/// A module with `count` exported `(i32, i32) -> i32` functions.
fn synthetic_module(count: u32) -> Vec<u8> {
    let mut types = vec![];
    write_vu32(&mut types, 1);
    types.extend_from_slice(&[TYPE_FUNC, 0x02, 0x7f, 0x7f, 0x01, 0x7f]);

    let mut functions = vec![];
    let mut exports = vec![];
    let mut code = vec![];
    write_vu32(&mut functions, count);
    write_vu32(&mut exports, count);
    write_vu32(&mut code, count);
    for i in 0..count {
        write_vu32(&mut functions, 0);
        write_name(&mut exports, &format!("add{}", i));
        exports.push(DESC_FUNC);
        write_vu32(&mut exports, i);
        write_u8vec(&mut code, &[0x01, 0x02, 0x7f, 0x20, 0x00, 0x20, 0x01, 0x6a, OP_END]);
    }
    module_bytes(&[
        (SECTION_TYPE, types),
        (SECTION_FUNCTION, functions),
        (SECTION_EXPORT, exports),
        (SECTION_CODE, code),
    ])
}

fn bench_fixtures(c: &mut Criterion) {
    let parser = Parser::new(ParserConfig::default());
    let mut group = c.benchmark_group("fixtures");
    for (name, wasm) in load_fixture_modules() {
        group.throughput(Throughput::Bytes(wasm.len() as u64));
        group.bench_function(name.as_str(), |b| b.iter(|| parser.parse(black_box(&wasm))));
    }
    group.finish();
}

fn bench_synthetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthetic");
    for count in [100u32, 10_000] {
        let wasm = synthetic_module(count);
        group.throughput(Throughput::Bytes(wasm.len() as u64));
        group.bench_function(format!("{}_functions", count), |b| {
            b.iter(|| parser::parse(black_box(&wasm)).expect("Failed to parse"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fixtures, bench_synthetic);
criterion_main!(benches);
