//! Smoke-test binary: loads configuration, builds a synthetic relation and
//! an INT32 index over it, runs a bounded scan, and logs the result. Not a
//! server — this crate exposes a library API, driven by an embedding
//! engine; this binary only demonstrates that the pieces fit together.
//! Usage: bptree-index [CONFIG_PATH]

use anyhow::Result;
use bptree_index::storage::{RelationFile, SequentialScanner};
use bptree_index::{AttrType, Config, Index, KeyValue, Opcode};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match env::args().nth(1) {
        Some(path) => Config::from_path(&PathBuf::from(path))?,
        None => Config::default_config(),
    };

    tracing::info!(data_dir = %config.data_dir, "bptree-index smoke test starting");

    let demo_dir = PathBuf::from(&config.data_dir).join("bptree_demo");
    std::fs::create_dir_all(&demo_dir)?;
    let rel_path = demo_dir.join("demo_orders.heap");
    let index_path = demo_dir.join(Index::file_name("demo_orders", 0));
    let _ = std::fs::remove_file(&rel_path);
    let _ = std::fs::remove_file(&index_path);

    let mut relation = RelationFile::create(&rel_path, 4)?;
    for v in 0..500i32 {
        relation.insert_record(&v.to_le_bytes())?;
    }

    let mut index = Index::open_or_create(&demo_dir, "demo_orders", 0, AttrType::Int32, config.buffer_pool_size)?;
    let inserted = {
        let mut scanner = SequentialScanner::new(&mut relation);
        index.bootstrap(&mut scanner)?
    };
    tracing::info!(inserted, "bootstrap complete");

    index.start_scan(KeyValue::Int32(100), Opcode::GT, KeyValue::Int32(110), Opcode::LTE)?;
    let mut found = Vec::new();
    loop {
        match index.scan_next() {
            Ok(rid) => found.push(rid),
            Err(_) => break,
        }
    }
    tracing::info!(count = found.len(), "scan(100, GT, 110, LTE) complete");

    index.close()?;
    let _ = std::fs::remove_file(&rel_path);
    let _ = std::fs::remove_file(&index_path);
    tracing::info!("bptree-index smoke test exiting");
    Ok(())
}
