use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tandem_core::{FsTree, NodeSnapshot};
use uuid::Uuid;

fn wide_tree(files: usize) -> (FsTree, Vec<Uuid>) {
    let mut tree = FsTree::new();
    let root = tree.root();
    let ids = (0..files)
        .map(|i| tree.create_file(root, &format!("file_{i}.txt")).unwrap())
        .collect();
    (tree, ids)
}

fn bench_node_lookup_1000(c: &mut Criterion) {
    let (tree, ids) = wide_tree(1000);
    let target = ids[500];

    c.bench_function("node_lookup_1000", |b| {
        b.iter(|| {
            black_box(tree.node(black_box(target)));
        })
    });
}

fn bench_create_delete_file(c: &mut Criterion) {
    c.bench_function("create_delete_file", |b| {
        let mut tree = FsTree::new();
        let root = tree.root();
        b.iter(|| {
            let id = tree.create_file(root, "scratch.txt").unwrap();
            tree.delete_file(black_box(id)).unwrap();
        })
    });
}

fn bench_update_content_4kb(c: &mut Criterion) {
    let (mut tree, ids) = wide_tree(10);
    let content = "x".repeat(4096);

    c.bench_function("update_content_4KB", |b| {
        b.iter(|| {
            tree.update_file_content(black_box(ids[0]), black_box(&content))
                .unwrap();
        })
    });
}

fn bench_snapshot_roundtrip_100(c: &mut Criterion) {
    let (tree, _) = wide_tree(100);

    c.bench_function("snapshot_roundtrip_100_files", |b| {
        b.iter(|| {
            let snap: NodeSnapshot = tree.to_snapshot();
            black_box(FsTree::from_snapshot(black_box(&snap)));
        })
    });
}

fn bench_delete_subtree_100(c: &mut Criterion) {
    c.bench_function("delete_subtree_100_files", |b| {
        b.iter_custom(|iters| {
            let mut total = std::time::Duration::ZERO;
            for _ in 0..iters {
                let mut tree = FsTree::new();
                let dir = tree.create_directory(tree.root(), "big").unwrap();
                for i in 0..100 {
                    tree.create_file(dir, &format!("f{i}.txt")).unwrap();
                }
                let start = std::time::Instant::now();
                tree.delete_directory(dir).unwrap();
                total += start.elapsed();
            }
            total
        })
    });
}

criterion_group!(
    benches,
    bench_node_lookup_1000,
    bench_create_delete_file,
    bench_update_content_4kb,
    bench_snapshot_roundtrip_100,
    bench_delete_subtree_100,
);
criterion_main!(benches);
