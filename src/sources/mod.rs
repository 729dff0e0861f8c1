pub mod csv_source;
pub mod util;

pub use csv_source::CsvTransactionSource;
