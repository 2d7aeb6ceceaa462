use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tandem_collab::broadcast::BroadcastGroup;
use tandem_collab::presence::Roster;
use tandem_collab::protocol::{Frame, RoomEvent, UserInfo};
use tandem_collab::room::RoomState;
use tandem_core::NodeSnapshot;
use std::sync::Arc;
use uuid::Uuid;

fn typical_edit_frame() -> Frame {
    Frame::new(
        Uuid::new_v4(),
        RoomEvent::FileUpdated {
            file_id: Uuid::new_v4(),
            content: "x".repeat(64), // typical small edit
        },
    )
}

fn bench_frame_encode(c: &mut Criterion) {
    let frame = typical_edit_frame();
    c.bench_function("frame_encode_64B", |b| {
        b.iter(|| {
            black_box(black_box(&frame).encode().unwrap());
        })
    });
}

fn bench_frame_decode(c: &mut Criterion) {
    let encoded = typical_edit_frame().encode().unwrap();
    c.bench_function("frame_decode_64B", |b| {
        b.iter(|| {
            black_box(Frame::decode(black_box(&encoded)).unwrap());
        })
    });
}

fn bench_sync_snapshot_encode(c: &mut Criterion) {
    let files: Vec<NodeSnapshot> = (0..100)
        .map(|i| NodeSnapshot::file(format!("file_{i}.rs"), "fn main() {}"))
        .collect();
    let frame = Frame::server(RoomEvent::Sync {
        tree: NodeSnapshot::directory("root", files),
        users: (0..10).map(|i| UserInfo::new(format!("user_{i}"))).collect(),
    });

    c.bench_function("sync_encode_100_files", |b| {
        b.iter(|| {
            black_box(black_box(&frame).encode().unwrap());
        })
    });
}

fn bench_broadcast_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let group = BroadcastGroup::new(1024);
    let receivers: Vec<_> = rt.block_on(async {
        let mut rxs = Vec::new();
        for i in 0..100 {
            rxs.push(group.add_peer(UserInfo::new(format!("peer_{i}"))).await);
        }
        rxs
    });
    let encoded = Arc::new(typical_edit_frame().encode().unwrap());

    c.bench_function("broadcast_100_peers", |b| {
        b.iter(|| {
            black_box(group.broadcast_raw(black_box(encoded.clone())));
        })
    });
    drop(receivers);
}

fn bench_apply_file_updated(c: &mut Criterion) {
    let mut state = RoomState::new(Uuid::nil());
    let files: Vec<NodeSnapshot> = (0..100)
        .map(|i| NodeSnapshot::file(format!("file_{i}.rs"), ""))
        .collect();
    let file_id = files[50].id;
    state.seed(&NodeSnapshot::directory("root", files), vec![]);
    let sender = Uuid::new_v4();
    let event = RoomEvent::FileUpdated {
        file_id,
        content: "x".repeat(256),
    };

    c.bench_function("apply_file_updated_100_file_tree", |b| {
        b.iter(|| {
            state.apply(black_box(sender), black_box(&event));
        })
    });
}

fn bench_roster_typing(c: &mut Criterion) {
    let mut roster = Roster::new(Uuid::nil());
    let peers: Vec<Uuid> = (0..50)
        .map(|i| {
            let user = UserInfo::new(format!("peer_{i}"));
            let id = user.id;
            roster.user_joined(user);
            id
        })
        .collect();

    c.bench_function("roster_typing_toggle_50_peers", |b| {
        b.iter(|| {
            for &id in &peers {
                roster.typing_start(black_box(id), Some(42));
                roster.typing_pause(black_box(id));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_sync_snapshot_encode,
    bench_broadcast_fanout,
    bench_apply_file_updated,
    bench_roster_typing
);
criterion_main!(benches);
