pub mod scan;
pub mod types;

pub use scan::{
    mean_score, Notification, ProductScanHistory, Scan, ScanSchedule, ScanStatus,
    ScheduleFrequency,
};
pub use types::{
    ComplianceFinding, ComplianceViolation, FindingStatus, Metafield, PolicyRule, Product,
    ProductRewrite, Severity,
};
