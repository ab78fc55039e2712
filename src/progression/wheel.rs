//! Lucky wheel weighted draw

use rand::Rng;

use crate::tuning::WheelPrize;

/// Weighted pick: draw in `[0, total)`, subtract weights in order until the
/// remainder is spent. Falls back to the last prize on rounding edge cases.
pub fn spin<'a>(prizes: &'a [WheelPrize], rng: &mut impl Rng) -> Option<&'a WheelPrize> {
    let total: f32 = prizes.iter().map(|p| p.weight.max(0.0)).sum();
    if total <= 0.0 {
        return prizes.last();
    }
    let mut remainder = rng.random_range(0.0..total);
    for prize in prizes {
        remainder -= prize.weight.max(0.0);
        if remainder <= 0.0 {
            return Some(prize);
        }
    }
    prizes.last()
}
