//! Reading and normalizing tabular log exports.

pub mod normalize;
pub mod parse;
pub mod row;

pub use normalize::normalize;
pub use parse::read_source_file;
pub use row::{Dataset, RawRow, Record};
