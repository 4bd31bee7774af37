pub mod encoding;
pub mod hex_fmt;
pub mod result_ext;
pub mod time;
