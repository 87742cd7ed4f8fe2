//! In-memory partition logs.
//!
//! Each (topic, partition) owns an append-only list of payloads. The offset of
//! a payload is its index in that list, so the list length is also the high
//! watermark. Serializes as `{ topic: { "partition": [payload, ...] } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionLogStore {
    topics: BTreeMap<String, BTreeMap<i32, Vec<String>>>,
}

impl PartitionLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one payload, creating the partition if needed, and return its offset.
    pub fn append(&mut self, topic: &str, partition: i32, payload: String) -> i64 {
        let log = self.log_mut(topic, partition);
        log.push(payload);
        (log.len() - 1) as i64
    }

    /// Append payloads in order and return the offset assigned to the first.
    ///
    /// With no payloads nothing is created and the current high watermark is
    /// returned.
    pub fn append_all<I>(&mut self, topic: &str, partition: i32, payloads: I) -> i64
    where
        I: IntoIterator<Item = String>,
    {
        let mut payloads = payloads.into_iter().peekable();
        if payloads.peek().is_none() {
            return self.high_watermark(topic, partition);
        }
        let log = self.log_mut(topic, partition);
        let base_offset = log.len() as i64;
        log.extend(payloads);
        base_offset
    }

    /// Payloads from `from_offset` to the end of the log.
    ///
    /// Unknown partitions, negative offsets and offsets past the end yield
    /// nothing.
    pub fn read(
        &self,
        topic: &str,
        partition: i32,
        from_offset: i64,
    ) -> impl Iterator<Item = &str> + '_ {
        let log = self.log(topic, partition).unwrap_or(&[]);
        let start = if from_offset < 0 {
            log.len()
        } else {
            usize::try_from(from_offset).map_or(log.len(), |o| o.min(log.len()))
        };
        log[start..].iter().map(String::as_str)
    }

    /// Offset the next append to this partition will receive.
    pub fn high_watermark(&self, topic: &str, partition: i32) -> i64 {
        self.log(topic, partition).map_or(0, |log| log.len() as i64)
    }

    /// Topic names in lexical order.
    pub fn topics(&self) -> impl Iterator<Item = &str> + '_ {
        self.topics.keys().map(String::as_str)
    }

    /// Partition indices of `topic`, or `None` if it has never been written.
    pub fn partitions(&self, topic: &str) -> Option<Vec<i32>> {
        self.topics
            .get(topic)
            .map(|partitions| partitions.keys().copied().collect())
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    fn log(&self, topic: &str, partition: i32) -> Option<&[String]> {
        self.topics
            .get(topic)
            .and_then(|partitions| partitions.get(&partition))
            .map(Vec::as_slice)
    }

    fn log_mut(&mut self, topic: &str, partition: i32) -> &mut Vec<String> {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .entry(partition)
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_consecutive_offsets() {
        let mut store = PartitionLogStore::new();
        assert_eq!(store.append("t", 0, "a".into()), 0);
        assert_eq!(store.append("t", 0, "b".into()), 1);
        assert_eq!(store.append("t", 1, "c".into()), 0);
        assert_eq!(store.high_watermark("t", 0), 2);
        assert_eq!(store.high_watermark("t", 1), 1);
    }

    #[test]
    fn test_append_all_returns_base_offset() {
        let mut store = PartitionLogStore::new();
        store.append("t", 0, "first".into());
        let base = store.append_all("t", 0, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(base, 1);
        assert_eq!(store.high_watermark("t", 0), 3);
    }

    #[test]
    fn test_append_all_empty_creates_nothing() {
        let mut store = PartitionLogStore::new();
        assert_eq!(store.append_all("t", 0, Vec::new()), 0);
        assert!(!store.contains_topic("t"));
    }

    #[test]
    fn test_read_from_offset() {
        let mut store = PartitionLogStore::new();
        for p in ["a", "b", "c"] {
            store.append("t", 0, p.to_string());
        }
        assert_eq!(store.read("t", 0, 1).collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(store.read("t", 0, 0).count(), 3);
        assert_eq!(store.read("t", 0, 3).count(), 0);
        assert_eq!(store.read("t", 0, 99).count(), 0);
        assert_eq!(store.read("t", 0, -1).count(), 0);
    }

    #[test]
    fn test_read_is_restartable() {
        let mut store = PartitionLogStore::new();
        store.append("t", 0, "a".into());
        let first: Vec<_> = store.read("t", 0, 0).collect();
        let second: Vec<_> = store.read("t", 0, 0).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_partition_reads_empty() {
        let store = PartitionLogStore::new();
        assert_eq!(store.read("nope", 0, 0).count(), 0);
        assert_eq!(store.high_watermark("nope", 0), 0);
        assert_eq!(store.partitions("nope"), None);
    }

    #[test]
    fn test_topics_and_partitions() {
        let mut store = PartitionLogStore::new();
        store.append("b", 2, "x".into());
        store.append("a", 0, "y".into());
        store.append("b", 0, "z".into());
        assert_eq!(store.topics().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(store.partitions("b"), Some(vec![0, 2]));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut store = PartitionLogStore::new();
        store.append("orders", 0, "o1".into());
        store.append("orders", 0, "o2".into());

        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json, serde_json::json!({ "orders": { "0": ["o1", "o2"] } }));

        let back: PartitionLogStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
    }
}
