//! Metadata request parsing.

use nom::{IResult, number::complete::be_u8};
use nombytes::NomBytes;

use crate::parser::{parse_compact_array, parse_compact_string, skip_tagged_fields};

/// Metadata request data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequestData {
    /// Requested topic names. Empty means all topics.
    pub topics: Vec<String>,
    pub allow_auto_topic_creation: bool,
    pub include_topic_authorized_operations: bool,
}

pub fn parse_metadata_request(s: NomBytes) -> IResult<NomBytes, MetadataRequestData> {
    let (s, topics) = parse_compact_array(parse_metadata_topic)(s)?;
    let (s, allow_auto_topic_creation) = be_u8(s)?;
    let (s, include_topic_authorized_operations) = be_u8(s)?;
    let (s, _) = skip_tagged_fields(s)?;

    Ok((
        s,
        MetadataRequestData {
            topics,
            allow_auto_topic_creation: allow_auto_topic_creation != 0,
            include_topic_authorized_operations: include_topic_authorized_operations != 0,
        },
    ))
}

fn parse_metadata_topic(s: NomBytes) -> IResult<NomBytes, String> {
    let (s, name) = parse_compact_string(s)?;
    let (s, _) = skip_tagged_fields(s)?;
    Ok((s, name))
}
