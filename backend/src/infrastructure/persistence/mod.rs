mod json_snapshot_repository;

pub use json_snapshot_repository::JsonSnapshotRepository;
