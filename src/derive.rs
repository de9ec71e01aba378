//! Computed attributes. Vintages are binned into decades with half-open,
//! ten-year-wide bins covering [1970, 2030).

use crate::models::Decade;

/// Lower edge of the first bin.
pub const FIRST_DECADE: i32 = 1970;
/// Exclusive upper edge of the last bin.
pub const DECADE_LIMIT: i32 = 2030;
const BIN_WIDTH: i32 = 10;

/// Decade bucket for a vintage, or `None` when the year is absent or falls
/// outside the binned range. Years are never pulled into a neighbouring bin.
pub fn decade_for(vintage: Option<i32>) -> Option<Decade> {
    let year = vintage?;
    if !(FIRST_DECADE..DECADE_LIMIT).contains(&year) {
        return None;
    }
    let offset = (year - FIRST_DECADE) / BIN_WIDTH;
    Some(Decade::starting(FIRST_DECADE + offset * BIN_WIDTH))
}
