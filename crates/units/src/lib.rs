//! # vault-units
//!
//! Precision-safe conversion between human decimal amounts and integer base units.
//!
//! Amounts never pass through binary floating point: decimal strings are parsed into an
//! arbitrary-precision [`DecimalAmount`], scaled with integer arithmetic and checked by a
//! mandatory round trip before a [`BaseUnits`] value is handed out.
//!
//! ```
//! use vault_units::{to_base_units, to_decimal_string};
//!
//! let wei = to_base_units("1.5", 18)?;
//! assert_eq!(wei.to_string(), "1500000000000000000");
//! assert_eq!(to_decimal_string(&wei, 18)?, "1.5");
//! # Ok::<_, vault_units::UnitsError>(())
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

mod base;
mod codec;
mod decimal;
mod display;
mod error;

pub use base::BaseUnits;
pub use codec::{AmountInput, MAX_DECIMALS, canonicalize, to_base_units, to_decimal_string};
pub use decimal::DecimalAmount;
pub use display::{
    DisplayOptions, FixedDisplay, format_decimal_for_display, format_fixed, format_for_display,
};
pub use error::UnitsError;
