//! Offset commit and offset fetch request parsing.
//!
//! Neither request carries tagged field sections.

use nom::{
    IResult,
    number::complete::{be_i32, be_i64},
};
use nombytes::NomBytes;

use crate::parser::{parse_compact_array, parse_compact_string};

/// OffsetCommit request data.
#[derive(Debug, Clone)]
pub struct OffsetCommitRequestData {
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: String,
    pub topics: Vec<OffsetCommitTopicData>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitTopicData {
    pub name: String,
    pub partitions: Vec<OffsetCommitPartitionData>,
}

#[derive(Debug, Clone)]
pub struct OffsetCommitPartitionData {
    pub partition_index: i32,
    pub committed_offset: i64,
    pub committed_metadata: String,
    /// -1 asks the broker to stamp the commit with its own clock.
    pub commit_timestamp: i64,
}

pub fn parse_offset_commit_request(s: NomBytes) -> IResult<NomBytes, OffsetCommitRequestData> {
    let (s, group_id) = parse_compact_string(s)?;
    let (s, generation_id) = be_i32(s)?;
    let (s, member_id) = parse_compact_string(s)?;
    let (s, group_instance_id) = parse_compact_string(s)?;
    let (s, topics) = parse_compact_array(parse_offset_commit_topic)(s)?;

    Ok((
        s,
        OffsetCommitRequestData {
            group_id,
            generation_id,
            member_id,
            group_instance_id,
            topics,
        },
    ))
}

fn parse_offset_commit_topic(s: NomBytes) -> IResult<NomBytes, OffsetCommitTopicData> {
    let (s, name) = parse_compact_string(s)?;
    let (s, partitions) = parse_compact_array(parse_offset_commit_partition)(s)?;

    Ok((s, OffsetCommitTopicData { name, partitions }))
}

fn parse_offset_commit_partition(s: NomBytes) -> IResult<NomBytes, OffsetCommitPartitionData> {
    let (s, partition_index) = be_i32(s)?;
    let (s, committed_offset) = be_i64(s)?;
    let (s, committed_metadata) = parse_compact_string(s)?;
    let (s, commit_timestamp) = be_i64(s)?;

    Ok((
        s,
        OffsetCommitPartitionData {
            partition_index,
            committed_offset,
            committed_metadata,
            commit_timestamp,
        },
    ))
}

/// OffsetFetch request data.
#[derive(Debug, Clone)]
pub struct OffsetFetchRequestData {
    pub group_id: String,
    pub topics: Vec<OffsetFetchTopicData>,
}

#[derive(Debug, Clone)]
pub struct OffsetFetchTopicData {
    pub name: String,
    pub partition_indexes: Vec<i32>,
}

pub fn parse_offset_fetch_request(s: NomBytes) -> IResult<NomBytes, OffsetFetchRequestData> {
    let (s, group_id) = parse_compact_string(s)?;
    let (s, topics) = parse_compact_array(parse_offset_fetch_topic)(s)?;

    Ok((s, OffsetFetchRequestData { group_id, topics }))
}

fn parse_offset_fetch_topic(s: NomBytes) -> IResult<NomBytes, OffsetFetchTopicData> {
    let (s, name) = parse_compact_string(s)?;
    let (s, partition_indexes) = parse_compact_array(be_i32)(s)?;

    Ok((
        s,
        OffsetFetchTopicData {
            name,
            partition_indexes,
        },
    ))
}
