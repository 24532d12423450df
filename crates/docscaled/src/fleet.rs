//! Fleet import: loads a cluster snapshot into the registry.
//!
//! redb holds an exclusive lock on its file, so this runs while the
//! server is stopped.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use docscale_core::DaemonConfig;
use docscale_state::{FleetSnapshot, StateStore};

pub fn import(config: &DaemonConfig, file: &Path) -> anyhow::Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let fleet: FleetSnapshot =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", file.display()))?;

    std::fs::create_dir_all(&config.store.data_dir)?;
    let store = StateStore::open(&config.store.data_dir.join("docscale.redb"))?;
    store.import_fleet(&fleet)?;

    info!(
        cluster = %fleet.cluster.cluster_id,
        members = fleet.cluster.members.len(),
        instances = fleet.instances.len(),
        "fleet imported"
    );
    Ok(())
}
