//! Encode/decode throughput for the APDU and ASDU codecs.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iec60870_core::asdu::{Asdu, InformationObject, TypeId, WireFormat};
use iec60870_core::common::CauseOfTransmission;
use iec60870_core::elements::InformationElement;
use iec60870_core::Apdu;

fn scaled_measurement(common_address: u16, object_count: usize) -> Asdu {
    let objects = (0..object_count)
        .map(|i| {
            InformationObject::new(
                100 + i as u32,
                vec![InformationElement::ScaledValue {
                    raw: (i as i16) % 2048,
                    quality: Default::default(),
                }],
            )
        })
        .collect();
    Asdu::new(
        TypeId::MMeNb1,
        false,
        CauseOfTransmission::Periodic,
        0,
        common_address,
        objects,
    )
}

fn bench_asdu_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("asdu_encode");
    let format = WireFormat::default();

    for object_count in [1, 10, 50] {
        let asdu = scaled_measurement(1, object_count);
        group.bench_function(format!("{object_count}_objects"), |b| {
            b.iter(|| {
                let encoded = asdu.encode(black_box(format)).unwrap();
                black_box(encoded);
            });
        });
    }

    group.finish();
}

fn bench_asdu_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("asdu_decode");
    let format = WireFormat::default();

    for object_count in [1, 10, 50] {
        let encoded = scaled_measurement(1, object_count).encode(format).unwrap();
        group.bench_function(format!("{object_count}_objects"), |b| {
            b.iter(|| {
                let decoded = Asdu::decode(black_box(&encoded), format).unwrap();
                black_box(decoded);
            });
        });
    }

    group.finish();
}

fn bench_apdu_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("apdu_roundtrip");
    let format = WireFormat::default();
    let apdu = Apdu::i_frame(0, 0, scaled_measurement(1, 1));

    group.bench_function("i_frame_single_object", |b| {
        b.iter(|| {
            let encoded = apdu.encode(black_box(format)).unwrap();
            let decoded = Apdu::decode(black_box(&encoded), format).unwrap();
            black_box(decoded);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_asdu_encode, bench_asdu_decode, bench_apdu_roundtrip);
criterion_main!(benches);
