//! Produce request parsing.

use bytes::Bytes;
use nom::{
    IResult,
    number::complete::{be_i16, be_i32},
};
use nombytes::NomBytes;

use crate::parser::{
    parse_compact_array, parse_compact_string, parse_nullable_bytes, skip_tagged_fields,
};

/// Produce request data.
#[derive(Debug, Clone)]
pub struct ProduceRequestData {
    pub transactional_id: String,
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<ProduceTopicData>,
}

#[derive(Debug, Clone)]
pub struct ProduceTopicData {
    pub name: String,
    pub partitions: Vec<ProducePartitionData>,
}

#[derive(Debug, Clone)]
pub struct ProducePartitionData {
    pub partition_index: i32,
    /// Raw record set; `None` when sent as null.
    pub records: Option<Bytes>,
}

pub fn parse_produce_request(s: NomBytes) -> IResult<NomBytes, ProduceRequestData> {
    let (s, transactional_id) = parse_compact_string(s)?;
    let (s, acks) = be_i16(s)?;
    let (s, timeout_ms) = be_i32(s)?;
    let (s, topics) = parse_compact_array(parse_produce_topic)(s)?;
    let (s, _) = skip_tagged_fields(s)?;

    Ok((
        s,
        ProduceRequestData {
            transactional_id,
            acks,
            timeout_ms,
            topics,
        },
    ))
}

fn parse_produce_topic(s: NomBytes) -> IResult<NomBytes, ProduceTopicData> {
    let (s, name) = parse_compact_string(s)?;
    let (s, partitions) = parse_compact_array(parse_produce_partition)(s)?;
    let (s, _) = skip_tagged_fields(s)?;

    Ok((s, ProduceTopicData { name, partitions }))
}

fn parse_produce_partition(s: NomBytes) -> IResult<NomBytes, ProducePartitionData> {
    let (s, partition_index) = be_i32(s)?;
    let (s, records) = parse_nullable_bytes(s)?;

    Ok((
        s,
        ProducePartitionData {
            partition_index,
            records,
        },
    ))
}
