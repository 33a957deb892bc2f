//! NMEA 0183 ingestion
//!
//! bytes -> SentenceAssembler -> Sentence -> Fields -> Rmc
//!
//! Assembly is cheap and runs wherever the uart bytes show up. Parsing runs later, outside the byte handler.
pub mod assembler;
pub mod fields;
pub mod rmc;

pub use assembler::{Sentence, SentenceAssembler};
pub use fields::Fields;
pub use rmc::{RMC_PREFIX, Rmc, RmcFix, parse_rmc};

/// the only byte that ends a sentence
pub const TERMINATOR: u8 = b'\n';

/// splits the data fields from the checksum
pub const CHECKSUM_DELIMITER: u8 = b'*';
