// Domain models: canonical payload, extension blocks, series points, upstream records.

mod details;
mod guest;
mod payload;
mod series;
pub mod upstream;

pub use details::{
    BackupItem, BackupServerDetails, BackupStoreDetails, ClusterDetails, ConnectionSummary,
    DatastoreSummary, Extension, GuestCounts, GuestDetails, GuestRow, HostCapacity, NodeDetails,
    NodeRow, Pagination, RootDetails, SubscriptionInfo,
};
pub use guest::{
    CpuConfig, DiskDescriptor, GuestConfigDetails, GuestOptions, MemoryConfig, NetDescriptor,
    PendingChange,
};
pub use payload::{CanonicalPayload, Gauge, HealthStatus, LabeledValue, Metrics};
pub use series::{SeriesPoint, SeriesSource, Timeframe};
pub use upstream::{DatastoreRecord, NodeRecord, ResourceRecord};
