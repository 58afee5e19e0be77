//! Denomination splitting
//!
//! Decomposes an amount into the power-of-two denominations the issuer signs.
//! By default this is the binary representation of the amount, ascending.
//! An explicit preference is expanded first; whatever it leaves uncovered is
//! filled with the binary decomposition of the shortfall.

use crate::error::{WalletError, WalletResult};
use crate::types::AmountPreference;

/// Upper bound on the number of outputs one preference may expand to
pub const MAX_OUTPUTS: usize = 1024;

/// Binary decomposition, smallest denomination first
pub fn default_split(amount: u64) -> Vec<u64> {
    (0..u64::BITS)
        .map(|bit| 1u64 << bit)
        .filter(|denomination| amount & denomination != 0)
        .collect()
}

/// Binary decomposition expressed as a preference list
pub fn default_preference(amount: u64) -> Vec<AmountPreference> {
    default_split(amount)
        .into_iter()
        .map(|denomination| AmountPreference::new(denomination, 1))
        .collect()
}

/// Split `amount` into denominations, honoring `preference` when given.
///
/// Preference entries are expanded in order. Units that would push the
/// running total past `amount` are skipped for that entry. The remaining
/// shortfall is covered by [`default_split`].
pub fn split_amount(amount: u64, preference: Option<&[AmountPreference]>) -> WalletResult<Vec<u64>> {
    let mut chunks = Vec::new();
    let mut covered = 0u64;

    if let Some(preference) = preference {
        for pref in preference {
            if !pref.amount.is_power_of_two() {
                return Err(WalletError::invalid_preference(format!(
                    "Preferred amount {} is not a power of two",
                    pref.amount
                )));
            }

            let fits = ((amount - covered) / pref.amount).min(pref.count);
            if chunks.len() as u64 + fits > MAX_OUTPUTS as u64 {
                return Err(WalletError::invalid_preference(format!(
                    "Preference expands to more than {} outputs",
                    MAX_OUTPUTS
                )));
            }

            chunks.extend(std::iter::repeat(pref.amount).take(fits as usize));
            covered += fits * pref.amount;
        }
    }

    chunks.extend(default_split(amount - covered));
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_split_examples() {
        assert!(default_split(0).is_empty());
        assert_eq!(default_split(1), vec![1]);
        assert_eq!(default_split(13), vec![1, 4, 8]);
        assert_eq!(default_split(64), vec![64]);
        assert_eq!(default_split(u64::MAX).len(), 64);
        assert_eq!(default_split(1 << 63), vec![1 << 63]);
    }

    #[test]
    fn test_default_split_exhaustive() {
        for amount in 0..=4096u64 {
            let parts = default_split(amount);
            assert_eq!(parts.iter().sum::<u64>(), amount);
            assert_eq!(parts.len() as u32, amount.count_ones());
            assert!(parts.iter().all(|p| p.is_power_of_two()));
            assert!(parts.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_preference_exact() {
        let preference = [AmountPreference::new(8, 2), AmountPreference::new(1, 4)];
        assert_eq!(split_amount(20, Some(&preference)).unwrap(), vec![8, 8, 1, 1, 1, 1]);
    }

    #[test]
    fn test_preference_shortfall_is_topped_up() {
        let preference = [AmountPreference::new(4, 1)];
        let parts = split_amount(15, Some(&preference)).unwrap();
        assert_eq!(parts, vec![4, 1, 2, 8]);
        assert_eq!(parts.iter().sum::<u64>(), 15);
    }

    #[test]
    fn test_preference_overshoot_is_truncated() {
        let preference = [AmountPreference::new(8, 5), AmountPreference::new(2, 1)];
        let parts = split_amount(19, Some(&preference)).unwrap();
        assert_eq!(parts, vec![8, 8, 2, 1]);
    }

    #[test]
    fn test_preference_rejects_non_power_of_two() {
        let err = split_amount(10, Some(&[AmountPreference::new(3, 1)])).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidPreference);
        assert!(split_amount(10, Some(&[AmountPreference::new(0, 1)])).is_err());
    }

    #[test]
    fn test_preference_output_limit() {
        let preference = [AmountPreference::new(1, u64::MAX)];
        assert!(split_amount(1 << 20, Some(&preference)).is_err());
        assert_eq!(split_amount(64, Some(&preference)).unwrap().len(), 64);
    }

    #[test]
    fn test_default_preference_round_trip() {
        for amount in [1u64, 7, 100, 1023] {
            let preference = default_preference(amount);
            assert_eq!(split_amount(amount, Some(&preference)).unwrap(), default_split(amount));
        }
    }

    #[test]
    fn test_empty_preference_is_default() {
        assert_eq!(split_amount(37, Some(&[])).unwrap(), default_split(37));
        assert_eq!(split_amount(37, None).unwrap(), default_split(37));
    }
}
