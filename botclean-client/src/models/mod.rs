//! Data models for botclean-client

pub mod credit;
pub mod dataset;
pub mod mapping;
pub mod processing_session;
pub mod summary;

pub use credit::{CreditInfo, UsageLevel};
pub use dataset::{Dataset, RowOverflow};
pub use mapping::{AdvancedOptions, ColumnMapping, MappingRole, ProcessingParameters};
pub use processing_session::{
    InvalidTransition, ProcessingSession, ProcessingState, StateTransition,
};
pub use summary::{BotStatus, BotTally, ProcessingSummary};
