pub mod errors;
pub mod reader;
mod registry;
pub mod schema;

pub use errors::{SchemaError, SourceError};
pub use reader::{read_table, read_table_from_reader};
pub use registry::{all_schema_names, schema_by_name};
pub use schema::{ColumnSpec, ColumnType, TableSchema};
