//! Replica selection: which readers to create or delete.
//!
//! Removal is greedy and zone-balancing: every pick comes from the zone
//! that currently holds the most tallied readers, so repeated scale-ins
//! drift the fleet toward an even reader-per-zone spread. Ties go to the
//! lexically smallest zone name.
//!
//! The tally counts readers in any lifecycle status, so a reader that is
//! still creating (or already deleting) can be picked.

use std::collections::BTreeMap;

use docscale_core::{InstanceId, InstanceSnapshot, NewInstanceSpec, ReaderSet};

/// Readers per availability zone, in discovery order within each zone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AzTally {
    zones: BTreeMap<String, Vec<InstanceId>>,
}

/// One planned deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub instance_id: InstanceId,
    pub zone: String,
    /// Readers tallied in `zone` when it was picked.
    pub zone_tally: usize,
}

impl AzTally {
    /// Tally every reader found in `instances`, in scan order.
    pub fn from_instances(readers: &ReaderSet, instances: &[InstanceSnapshot]) -> Self {
        instances
            .iter()
            .filter(|i| readers.contains(&i.instance_id))
            .fold(Self::default(), |tally, i| {
                tally.with_reader(&i.availability_zone, &i.instance_id)
            })
    }

    /// Append a reader to the end of its zone's list.
    pub fn with_reader(mut self, zone: &str, instance_id: &str) -> Self {
        self.zones
            .entry(zone.to_string())
            .or_default()
            .push(instance_id.to_string());
        self
    }

    /// Readers currently tallied in `zone`.
    pub fn tally(&self, zone: &str) -> usize {
        self.zones.get(zone).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    /// The zone with the most readers; the lexically smallest on ties.
    /// `None` once every zone is empty.
    pub fn largest_zone(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (zone, readers) in &self.zones {
            let count = readers.len();
            if count == 0 {
                continue;
            }
            if best.is_none_or(|(_, max)| count > max) {
                best = Some((zone.as_str(), count));
            }
        }
        best.map(|(zone, _)| zone)
    }

    /// Take the first reader of the largest zone.
    ///
    /// Returns the shrunken tally together with the pick, or the tally
    /// unchanged and `None` when nothing is left.
    pub fn take_from_largest(mut self) -> (Self, Option<Removal>) {
        let Some(zone) = self.largest_zone().map(str::to_string) else {
            return (self, None);
        };
        let readers = self.zones.entry(zone.clone()).or_default();
        let zone_tally = readers.len();
        let instance_id = readers.remove(0);
        let removal = Removal {
            instance_id,
            zone,
            zone_tally,
        };
        (self, Some(removal))
    }
}

/// Plan up to `count` deletions, re-evaluating the largest zone after
/// each pick. Yields `min(count, total)` removals.
pub fn plan_removal(tally: AzTally, count: usize) -> Vec<Removal> {
    let mut tally = tally;
    let mut removals = Vec::with_capacity(count.min(tally.total()));
    for _ in 0..count {
        let (rest, pick) = tally.take_from_largest();
        tally = rest;
        match pick {
            Some(removal) => removals.push(removal),
            None => break,
        }
    }
    removals
}

/// Instance class and engine copied onto new readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderTemplate {
    pub instance_class: String,
    pub engine: String,
}

impl ReaderTemplate {
    /// Template from the first reader found in `instances`. The fleet is
    /// assumed homogeneous.
    pub fn from_instances(readers: &ReaderSet, instances: &[InstanceSnapshot]) -> Option<Self> {
        instances
            .iter()
            .find(|i| readers.contains(&i.instance_id))
            .map(|i| Self {
                instance_class: i.instance_class.clone(),
                engine: i.engine.clone(),
            })
    }
}

/// Plan `count` new readers named `{name_prefix}-{ordinal}-{seed}`.
///
/// `unique_seed` is called once per instance.
pub fn plan_creation(
    template: &ReaderTemplate,
    cluster_id: &str,
    count: usize,
    name_prefix: &str,
    unique_seed: &dyn Fn() -> String,
) -> Vec<NewInstanceSpec> {
    (0..count)
        .map(|ordinal| NewInstanceSpec {
            instance_id: format!("{name_prefix}-{ordinal}-{}", unique_seed()),
            cluster_id: cluster_id.to_string(),
            instance_class: template.instance_class.clone(),
            engine: template.engine.clone(),
        })
        .collect()
}
