//! Column-to-group mapping and the final date-keyed merge.
//!
//! Every session has one `Date` group, fed by each file's date column, and
//! one or more value groups. Each group picks at most one column per file and
//! a column feeds at most one group per file. Merging produces
//! [`GroupedData`]:
//!
//! ```text
//! { "2024-01-01T00:00:00.000Z": { "Value Group 1": { "sensor_a": 10.0 } } }
//! ```

mod groups;
mod merge;
mod output;

pub use groups::{DATE_GROUP_ID, DATE_GROUP_NAME, Group, GroupSet, VALUE_GROUP_ID};
pub use merge::{MappingErrors, group_and_transform_data, validate_data_mappings};
pub use output::{GroupValues, GroupedData, TimeSeriesQuery};
