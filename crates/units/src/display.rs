//! Presentation helpers.
//!
//! Everything here is cosmetic: strings produced by these functions may be rounded and must
//! never be fed back into [`to_base_units`](crate::to_base_units).

use crate::{
    BaseUnits, UnitsError,
    codec::{check_decimals, split},
    to_base_units,
};
use num_bigint::BigUint;
use num_format::{Locale, ToFormattedString};
use num_traits::Zero;

/// How balances are shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Fractional digits shown before truncation kicks in.
    pub max_fraction_digits: usize,
    /// Separate thousands in the whole part (`1,234.5`).
    pub group_thousands: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self { max_fraction_digits: 6, group_thousands: false }
    }
}

impl DisplayOptions {
    pub fn new(max_fraction_digits: usize) -> Self {
        Self { max_fraction_digits, ..Default::default() }
    }

    pub fn grouped(mut self) -> Self {
        self.group_thousands = true;
        self
    }

    fn whole(&self, whole: &BigUint) -> String {
        if self.group_thousands {
            whole.to_formatted_string(&Locale::en)
        } else {
            whole.to_string()
        }
    }
}

/// Formats base units for display, truncating to `max_fraction_digits`.
///
/// Truncation rounds down so a balance is never overstated. A non-zero amount never collapses
/// to `"0"`: when every shown digit would be zero, the fraction is extended up to its first
/// significant digit.
///
/// ```
/// use vault_units::{BaseUnits, DisplayOptions, format_for_display};
///
/// let opts = DisplayOptions::new(4);
/// assert_eq!(format_for_display(&BaseUnits::from(1_234_567_891u64), 6, &opts)?, "1234.5678");
/// assert_eq!(format_for_display(&BaseUnits::from(1u64), 18, &opts)?, "0.000000000000000001");
/// # Ok::<_, vault_units::UnitsError>(())
/// ```
pub fn format_for_display(
    amount: &BaseUnits,
    decimals: u32,
    opts: &DisplayOptions,
) -> Result<String, UnitsError> {
    check_decimals(decimals)?;

    let (whole, frac) = split(amount, decimals);
    let whole_text = opts.whole(&whole);

    let shown = frac[..frac.len().min(opts.max_fraction_digits)].trim_end_matches('0');
    let shown = if shown.is_empty() && whole.is_zero() && !amount.is_zero() {
        match frac.find(|c: char| c != '0') {
            Some(idx) => &frac[..=idx],
            None => shown,
        }
    } else {
        shown
    };

    if shown.is_empty() { Ok(whole_text) } else { Ok(format!("{whole_text}.{shown}")) }
}

/// Formats a decimal string for display.
///
/// The string is first converted with [`to_base_units`], so malformed or precision-losing input
/// is reported rather than displayed.
pub fn format_decimal_for_display(
    amount: &str,
    decimals: u32,
    opts: &DisplayOptions,
) -> Result<String, UnitsError> {
    format_for_display(&to_base_units(amount, decimals)?, decimals, opts)
}

/// A fixed-width rendering together with a flag telling whether it hides a non-zero amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedDisplay {
    pub text: String,
    /// The amount is non-zero but every shown digit is zero.
    pub rounds_to_zero: bool,
}

/// Formats base units with exactly `width` fractional digits, zero-padded and truncated.
///
/// ```
/// use vault_units::{BaseUnits, format_fixed};
///
/// let fixed = format_fixed(&BaseUnits::from(1u64), 18, 4)?;
/// assert_eq!(fixed.text, "0.0000");
/// assert!(fixed.rounds_to_zero);
/// # Ok::<_, vault_units::UnitsError>(())
/// ```
pub fn format_fixed(
    amount: &BaseUnits,
    decimals: u32,
    width: usize,
) -> Result<FixedDisplay, UnitsError> {
    check_decimals(decimals)?;

    let (whole, frac) = split(amount, decimals);
    let mut shown: String = frac.chars().take(width).collect();
    while shown.len() < width {
        shown.push('0');
    }

    let rounds_to_zero =
        !amount.is_zero() && whole.is_zero() && shown.bytes().all(|b| b == b'0');
    let text = if width == 0 { whole.to_string() } else { format!("{whole}.{shown}") };
    Ok(FixedDisplay { text, rounds_to_zero })
}
