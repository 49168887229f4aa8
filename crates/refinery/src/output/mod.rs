//! Output naming and writers.

mod writer;

pub use writer::{arrow_type, output_path, to_record_batch, Writer, OUTPUT_SUFFIX};
