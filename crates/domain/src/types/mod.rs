//! Domain types and models

pub mod batch;
pub mod member;
pub mod record;
pub mod schema;

pub use batch::{BatchJob, BatchOperation, BatchStatus, ExportTable, OperationMethod, RunReport};
pub use member::MemberPayload;
pub use record::{ColumnInfo, ColumnValue, ContactRecord};
pub use schema::{
    is_datetime_type, CategoryRef, FieldOptions, FieldType, InterestRef, ListRef, NewMergeField,
    RemoteField,
};
