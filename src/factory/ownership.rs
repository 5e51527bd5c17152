//! Greedy percentage splits that sum to exactly 100%

use rand::Rng;

use super::ConstraintError;
use crate::model::Percentage;

/// Split 100% across `owners` shares, each at least `min_share`.
///
/// The first `n-1` owners draw from `[min, remaining - (n-i-1)*min]` and the last
/// owner takes the remainder, so the hundredths always add up to 10 000.
pub fn split_ownership<R: Rng + ?Sized>(
    rng: &mut R,
    owners: usize,
    min_share: Percentage,
) -> Result<Vec<Percentage>, ConstraintError> {
    let min = min_share.hundredths().max(1);
    let full = Percentage::FULL.hundredths();

    if owners == 0 || (owners as u64) * u64::from(min) > u64::from(full) {
        return Err(ConstraintError::InfeasibleSplit {
            owners,
            min_share: Percentage::from_hundredths(min),
        });
    }

    let mut shares = Vec::with_capacity(owners);
    let mut remaining = full;
    for i in 0..owners - 1 {
        let reserve = (owners - i - 1) as u32 * min;
        let upper = remaining - reserve;
        let share = rng.gen_range(min..=upper);
        shares.push(Percentage::from_hundredths(share));
        remaining -= share;
    }
    shares.push(Percentage::from_hundredths(remaining));

    Ok(shares)
}
