//! Pure parsers for the miner CLI's loosely-structured text output.
//!
//! Every parser here takes a string blob and returns partial results,
//! tolerating format drift: unrecognized lines are logged and skipped,
//! never fatal. No I/O happens in this module.

pub mod csv;
pub mod df;
pub mod kv;
pub mod table;
pub mod value;

pub use csv::parse_hbbft_csv;
pub use df::{DfEntry, parse_df};
pub use kv::parse_kv_lines;
pub use table::parse_pipe_table;
pub use value::{Value, coerce, parse_ratio};
