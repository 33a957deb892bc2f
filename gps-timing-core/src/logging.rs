//! host builds log through `log`, firmware builds through `defmt`. everything else in the crate imports from here
#[cfg(feature = "log")]
pub use log::{debug, error, info, trace, warn};

#[cfg(all(not(feature = "log"), feature = "defmt"))]
pub use defmt::{debug, error, info, trace, warn};

#[cfg(not(any(feature = "log", feature = "defmt")))]
compile_error!("enable either the `log` or the `defmt` feature");
