//! Header names attached to outgoing metric payloads.

pub const ORIGINATING_ENDPOINT: &str = "NServiceBus.OriginatingEndpoint";
pub const ORIGINATING_MACHINE: &str = "NServiceBus.OriginatingMachine";
pub const ORIGINATING_HOST_ID: &str = "$.diagnostics.originating.hostid";
pub const HOST_DISPLAY_NAME: &str = "$.diagnostics.hostdisplayname";
pub const CONTENT_TYPE: &str = "NServiceBus.ContentType";
pub const METRIC_TYPE: &str = "NServiceBus.Metric.Type";
pub const METRIC_INSTANCE_ID: &str = "NServiceBus.Metric.InstanceId";

/// Content type of tagged value payloads
pub const TAGGED_VALUE_CONTENT_TYPE: &str = "TaggedLongValueWriterOccurrence";
