//! Test module tree for the TIFF container code

mod test_utils;
mod reader_tests;
mod types_tests;
