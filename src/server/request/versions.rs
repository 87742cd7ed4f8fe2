//! API versions request parsing.

use nom::IResult;
use nombytes::NomBytes;

/// ApiVersions request data. The body carries nothing the broker uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionsRequestData;

pub fn parse_api_versions_request(s: NomBytes) -> IResult<NomBytes, ApiVersionsRequestData> {
    Ok((s, ApiVersionsRequestData))
}
