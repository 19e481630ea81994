pub mod domain;
pub mod error;
pub mod ingestion;
pub mod masking;
pub mod memory;
pub mod ports;
pub mod progression;
pub mod scheduling;
pub mod selector;

pub use domain::{
    Line, LineId, LineSchedule, NewLine, NewText, ReviewOutcome, Text, TextChanges, TextId,
};
pub use error::{CoreError, CoreResult};
pub use memory::InMemoryRecordStore;
pub use ports::{
    BatchOutcome, LineFilter, LineOrder, PortError, PortResult, RecordStore, TextRef, WriteBatch,
    WriteOp,
};
pub use progression::ReviewReport;
