mod cache;
mod parser;
mod resolver;
mod types;

pub use cache::{CacheStats, SchemaCache};
pub use parser::{parse_schema, parse_schema_str};
pub use resolver::RefResolver;
pub use types::*;
