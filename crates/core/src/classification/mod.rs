//! Column classification
//!
//! Every source column is classified once per run into a typed plan. The
//! transformer consumes the resolved plan and never re-parses column names.

pub mod plan;

pub use plan::{
    ColumnClass, ColumnTarget, FieldPlan, InterestGroup, InterestIndex, PlannedColumn,
    TransformPlan,
};
