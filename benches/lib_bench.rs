extern crate hekafile;
use std::io::Cursor;

use hekafile::{Field, Message, UnpackOptions, ValueType};
use prost::Message as _;

fn ping(seq: usize) -> Message {
    let histogram = format!(
        r#"{{"bucket_count": 20, "values": {{"0": {}, "1": 3, "2": 0}}}}"#,
        seq
    );
    Message {
        uuid: vec![7; 16],
        timestamp: 1_500_000_000_000_000_000,
        r#type: Some("telemetry".to_string()),
        hostname: Some("ip-10-0-0-1".to_string()),
        payload: Some(format!(r#"{{"seq": {}, "application": {{"name": "Firefox"}}}}"#, seq)),
        fields: vec![
            Field {
                name: "payload.histograms".to_string(),
                value_type: Some(ValueType::String as i32),
                value_string: vec![histogram],
                ..Default::default()
            },
            Field {
                name: "docType".to_string(),
                value_type: Some(ValueType::String as i32),
                value_string: vec!["main".to_string()],
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn stream(n: usize, snappy: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    for seq in 0..n {
        let mut body = ping(seq).encode_to_vec();
        if snappy {
            body = snap::raw::Encoder::new().compress_vec(&body).expect("cannot compress");
        }
        let header = hekafile::Header {
            message_length: Some(body.len() as u32),
            ..Default::default()
        }
        .encode_to_vec();

        buf.push(0x1e);
        buf.push(header.len() as u8);
        buf.extend_from_slice(&header);
        buf.push(0x1f);
        buf.extend_from_slice(&body);
    }
    buf
}

fn read_frames(buf: &[u8], options: UnpackOptions) {
    for frame in hekafile::unpack_bytes(buf, options).flatten() {
        criterion::black_box(frame);
    }
}

fn read_records(buf: &[u8]) {
    for record in hekafile::parse_message(Cursor::new(buf)).flatten() {
        criterion::black_box(record);
    }
}

fn criterion_benchmark(c: &mut criterion::Criterion) {
    let plain = stream(1_000, false);
    let snappy = stream(1_000, true);

    c.bench_function("unpack plain frames", |b| {
        b.iter(|| read_frames(&plain, UnpackOptions::default().try_snappy(false)))
    });
    c.bench_function("unpack snappy frames", |b| {
        b.iter(|| read_frames(&snappy, UnpackOptions::default()))
    });
    c.bench_function("unpack raw frames", |b| {
        b.iter(|| read_frames(&snappy, UnpackOptions::default().raw(true)))
    });
    c.bench_function("parse snappy records", |b| b.iter(|| read_records(&snappy)));
}

criterion::criterion_group!(benches, criterion_benchmark);
criterion::criterion_main!(benches);
