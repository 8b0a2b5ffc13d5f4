//! Describe metadata: payload types, cache and providers

pub mod cache;
pub mod describe;
pub mod provider;

pub use cache::{DescribeCache, DescribeRequest, DescribeState, DescribeStatus, MetadataCache};
pub use describe::{
    ChildRelationship, FieldDescribe, GlobalDescribe, PicklistValue, SObjectDescribe,
    SObjectSummary,
};
pub use provider::{DescribeResponse, DirectoryMetadataProvider, MetadataProvider, fetch_all};
