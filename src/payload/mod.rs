//! Application layer: record scanning, DIB/VIB decoding, value codecs and
//! the variable data structure that ties them together.

pub mod data_encoding;
pub mod record;
pub mod variable_data;
pub mod vif;
mod vif_tables;
