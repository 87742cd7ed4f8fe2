//! Committed consumer group offsets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Offset committed by a group for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetEntry {
    pub offset: i64,
    pub metadata: String,
    /// Milliseconds since the epoch, or -1 when unknown.
    pub commit_timestamp: i64,
}

impl OffsetEntry {
    pub fn new(offset: i64, metadata: impl Into<String>, commit_timestamp: i64) -> Self {
        Self {
            offset,
            metadata: metadata.into(),
            commit_timestamp,
        }
    }
}

/// On-disk form: `{ group: { topic: { "partition": offset } } }`.
type OffsetSnapshot = BTreeMap<String, BTreeMap<String, BTreeMap<i32, i64>>>;

/// Last committed offset per (group, topic, partition). Last writer wins.
///
/// Only offsets survive serialization; entries read back from a snapshot have
/// empty metadata and a commit timestamp of -1.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OffsetSnapshot", into = "OffsetSnapshot")]
pub struct ConsumerOffsetTable {
    groups: BTreeMap<String, BTreeMap<String, BTreeMap<i32, OffsetEntry>>>,
}

impl ConsumerOffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, group: &str, topic: &str, partition: i32, entry: OffsetEntry) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .entry(topic.to_string())
            .or_default()
            .insert(partition, entry);
    }

    pub fn fetch(&self, group: &str, topic: &str, partition: i32) -> Option<&OffsetEntry> {
        self.groups.get(group)?.get(topic)?.get(&partition)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl From<OffsetSnapshot> for ConsumerOffsetTable {
    fn from(snapshot: OffsetSnapshot) -> Self {
        let groups = snapshot
            .into_iter()
            .map(|(group, topics)| {
                let topics = topics
                    .into_iter()
                    .map(|(topic, partitions)| {
                        let partitions = partitions
                            .into_iter()
                            .map(|(partition, offset)| {
                                (partition, OffsetEntry::new(offset, "", -1))
                            })
                            .collect();
                        (topic, partitions)
                    })
                    .collect();
                (group, topics)
            })
            .collect();
        Self { groups }
    }
}

impl From<ConsumerOffsetTable> for OffsetSnapshot {
    fn from(table: ConsumerOffsetTable) -> Self {
        table
            .groups
            .into_iter()
            .map(|(group, topics)| {
                let topics = topics
                    .into_iter()
                    .map(|(topic, partitions)| {
                        let partitions = partitions
                            .into_iter()
                            .map(|(partition, entry)| (partition, entry.offset))
                            .collect();
                        (topic, partitions)
                    })
                    .collect();
                (group, topics)
            })
            .collect()
    }
}
