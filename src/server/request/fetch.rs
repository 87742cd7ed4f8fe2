//! Fetch request parsing.

use nom::{
    IResult,
    number::complete::{be_i8, be_i32, be_i64},
};
use nombytes::NomBytes;

use crate::parser::{parse_compact_array, parse_compact_string, skip_tagged_fields};

/// Fetch request data.
#[derive(Debug, Clone)]
pub struct FetchRequestData {
    pub replica_id: i32,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub session_id: i32,
    pub session_epoch: i32,
    pub topics: Vec<FetchTopicData>,
    pub forgotten_topics: Vec<ForgottenTopicData>,
    pub rack_id: String,
}

#[derive(Debug, Clone)]
pub struct FetchTopicData {
    pub name: String,
    pub partitions: Vec<FetchPartitionData>,
}

#[derive(Debug, Clone)]
pub struct FetchPartitionData {
    pub partition_index: i32,
    pub current_leader_epoch: i32,
    pub fetch_offset: i64,
    pub last_fetched_epoch: i32,
    pub log_start_offset: i64,
    pub partition_max_bytes: i32,
}

#[derive(Debug, Clone)]
pub struct ForgottenTopicData {
    pub name: String,
    pub partitions: Vec<i32>,
}

pub fn parse_fetch_request(s: NomBytes) -> IResult<NomBytes, FetchRequestData> {
    let (s, replica_id) = be_i32(s)?;
    let (s, max_wait_ms) = be_i32(s)?;
    let (s, min_bytes) = be_i32(s)?;
    let (s, max_bytes) = be_i32(s)?;
    let (s, isolation_level) = be_i8(s)?;
    let (s, session_id) = be_i32(s)?;
    let (s, session_epoch) = be_i32(s)?;
    let (s, topics) = parse_compact_array(parse_fetch_topic)(s)?;
    let (s, forgotten_topics) = parse_compact_array(parse_forgotten_topic)(s)?;
    let (s, rack_id) = parse_compact_string(s)?;
    let (s, _) = skip_tagged_fields(s)?;

    Ok((
        s,
        FetchRequestData {
            replica_id,
            max_wait_ms,
            min_bytes,
            max_bytes,
            isolation_level,
            session_id,
            session_epoch,
            topics,
            forgotten_topics,
            rack_id,
        },
    ))
}

fn parse_fetch_topic(s: NomBytes) -> IResult<NomBytes, FetchTopicData> {
    let (s, name) = parse_compact_string(s)?;
    let (s, partitions) = parse_compact_array(parse_fetch_partition)(s)?;
    let (s, _) = skip_tagged_fields(s)?;

    Ok((s, FetchTopicData { name, partitions }))
}

fn parse_fetch_partition(s: NomBytes) -> IResult<NomBytes, FetchPartitionData> {
    let (s, partition_index) = be_i32(s)?;
    let (s, current_leader_epoch) = be_i32(s)?;
    let (s, fetch_offset) = be_i64(s)?;
    let (s, last_fetched_epoch) = be_i32(s)?;
    let (s, log_start_offset) = be_i64(s)?;
    let (s, partition_max_bytes) = be_i32(s)?;
    let (s, _) = skip_tagged_fields(s)?;

    Ok((
        s,
        FetchPartitionData {
            partition_index,
            current_leader_epoch,
            fetch_offset,
            last_fetched_epoch,
            log_start_offset,
            partition_max_bytes,
        },
    ))
}

fn parse_forgotten_topic(s: NomBytes) -> IResult<NomBytes, ForgottenTopicData> {
    let (s, name) = parse_compact_string(s)?;
    let (s, partitions) = parse_compact_array(be_i32)(s)?;
    let (s, _) = skip_tagged_fields(s)?;

    Ok((s, ForgottenTopicData { name, partitions }))
}
