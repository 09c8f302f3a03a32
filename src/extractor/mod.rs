//! Region extraction: planning transfers and copying decoded samples

pub mod region;
pub mod mapper;
pub mod transfer;
pub mod control;

pub use region::Region;
pub use mapper::{plan, TransferPlan, TransferUnit};
pub use transfer::{gather_unit, TransferEngine};
pub use control::{AbortFlag, ProgressObserver, TransferControl};
