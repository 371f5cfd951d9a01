//! Benchmarks for the routing hot paths.
//!
//! Forwarding runs once per routed message; bind/unbind runs once per
//! session join/leave.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use busd_core::{FieldId, HeaderFields, HeaderValue, Message, PeerName};
use busd_router::SessionRouteTable;
use busd_testkit::MemoryLink;

fn bench_forward_bound_session(c: &mut Criterion) {
    let link = MemoryLink::new(1, ":b2b.1");
    let table = SessionRouteTable::new(PeerName::new(":peer.bench"), link.clone());
    table.bind_session(7, link).unwrap();

    let mut fields = HeaderFields::new();
    fields.set(FieldId::SessionId, HeaderValue::U32(7));
    let msg = Message::new(1, fields, b"header", b"body");

    c.bench_function("forward_bound_session", |b| {
        b.iter(|| table.forward(black_box(&msg)));
    });
}

fn bench_bind_unbind_cycle(c: &mut Criterion) {
    let link = MemoryLink::new(1, ":b2b.1");
    let table = SessionRouteTable::new(PeerName::new(":peer.bench"), link.clone());

    c.bench_function("bind_unbind_cycle", |b| {
        b.iter(|| {
            table.bind_session(black_box(7), link.clone()).unwrap();
            table.unbind_session(black_box(7)).unwrap();
        });
    });
}

criterion_group!(benches, bench_forward_bound_session, bench_bind_unbind_cycle);
criterion_main!(benches);
