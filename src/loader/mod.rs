pub mod parser;

pub use parser::{parse_json_file, parse_json_value};
