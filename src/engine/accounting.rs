//! Escrow and fee accounting - exact integer arithmetic, no floats.

use crate::core::{Amount, Error, FeeConfig, Result, Settlement, SettlementPath, Timestamp};

/// Rent divided between lister and platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentSplit {
    pub lister_share: Amount,
    pub platform_fee: Amount,
}

/// `floor(rent × share / denominator)` to the lister, remainder to the platform.
pub fn split_rent(rent: Amount, fees: &FeeConfig) -> Result<RentSplit> {
    let share = fees.lister_share();
    let den = fees.denominator();
    if den == 0 || share > den {
        return Err(Error::Config(format!("invalid fee ratio {}/{}", share, den)));
    }

    // Split the product so `rent × share` cannot overflow: both terms are exact.
    let whole = (rent / den)
        .checked_mul(share)
        .ok_or_else(|| Error::InvalidArgument(format!("rent {} overflows fee split", rent)))?;
    let lister_share = whole + (rent % den) * share / den;

    Ok(RentSplit {
        lister_share,
        platform_fee: rent - lister_share,
    })
}

/// Care deposit locked in at rent time.
pub fn care_deposit(capability: Amount, unit_price: Amount) -> Result<Amount> {
    capability.checked_mul(unit_price).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "care deposit overflows: capability {} × price {}",
            capability, unit_price
        ))
    })
}

/// Inputs to a settlement, all read under the book lock.
#[derive(Debug, Clone, Copy)]
pub struct SettlementInput {
    pub rent: Amount,
    pub care_deposit: Amount,
    pub restocked: bool,
    /// Oracle price at settlement time, charged once if the card was left empty.
    pub unit_price_now: Amount,
}

/// Distribute an order's escrow.
///
/// The penalty moves from the tenant's refund to the lister's payout and is
/// capped at the deposit, so every unit escrowed is paid out exactly once.
pub fn settle(
    input: SettlementInput,
    fees: &FeeConfig,
    path: SettlementPath,
    settled_at: Timestamp,
) -> Result<Settlement> {
    let split = split_rent(input.rent, fees)?;
    let penalty = if input.restocked {
        0
    } else {
        input.unit_price_now.min(input.care_deposit)
    };

    let lister_payout = split
        .lister_share
        .checked_add(penalty)
        .ok_or_else(|| Error::InvalidArgument("lister payout overflows".into()))?;

    Ok(Settlement {
        path,
        restocked: input.restocked,
        lister_payout,
        tenant_refund: input.care_deposit - penalty,
        platform_fee: split.platform_fee,
        penalty,
        settled_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHER: Amount = 1_000_000_000_000_000_000;

    #[test]
    fn test_split_seven_tokens() {
        let split = split_rent(7 * ETHER, &FeeConfig::default()).unwrap();
        assert_eq!(split.lister_share, 7 * ETHER * 997 / 1000);
        assert_eq!(split.platform_fee, 7 * ETHER * 3 / 1000);
    }

    #[test]
    fn test_split_floors_toward_platform() {
        // 1999 × 0.997 = 1993.003 → lister 1993, platform 6
        let split = split_rent(1999, &FeeConfig::default()).unwrap();
        assert_eq!(split.lister_share, 1993);
        assert_eq!(split.platform_fee, 6);

        let tiny = split_rent(1, &FeeConfig::default()).unwrap();
        assert_eq!(tiny.lister_share, 0);
        assert_eq!(tiny.platform_fee, 1);
    }

    #[test]
    fn test_split_matches_naive_floor() {
        let fees = FeeConfig::default();
        for rent in [0u128, 3, 999, 1000, 1001, 123_456_789, 7 * ETHER + 1] {
            let split = split_rent(rent, &fees).unwrap();
            assert_eq!(split.lister_share, rent * 997 / 1000, "rent {}", rent);
            assert_eq!(split.lister_share + split.platform_fee, rent);
        }
    }

    #[test]
    fn test_split_huge_rent_does_not_overflow() {
        let split = split_rent(Amount::MAX, &FeeConfig::default()).unwrap();
        assert_eq!(split.lister_share + split.platform_fee, Amount::MAX);
    }

    #[test]
    fn test_care_deposit_overflow() {
        assert_eq!(care_deposit(12, 5).unwrap(), 60);
        assert!(matches!(care_deposit(Amount::MAX, 2), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_settle_restocked_refunds_everything() {
        let input = SettlementInput {
            rent: 7 * ETHER,
            care_deposit: 60,
            restocked: true,
            unit_price_now: 5,
        };
        let s = settle(input, &FeeConfig::default(), SettlementPath::Tenant, 10).unwrap();
        assert_eq!(s.penalty, 0);
        assert_eq!(s.tenant_refund, 60);
        assert_eq!(s.lister_payout, 7 * ETHER * 997 / 1000);
        assert_eq!(s.total_paid(), 7 * ETHER + 60);
    }

    #[test]
    fn test_settle_penalty_moves_to_lister() {
        let input = SettlementInput {
            rent: 7 * ETHER,
            care_deposit: 60,
            restocked: false,
            unit_price_now: 5,
        };
        let s = settle(input, &FeeConfig::default(), SettlementPath::Tenant, 10).unwrap();
        assert_eq!(s.penalty, 5);
        assert_eq!(s.tenant_refund, 55);
        assert_eq!(s.lister_payout, 7 * ETHER * 997 / 1000 + 5);
        assert_eq!(s.total_paid(), 7 * ETHER + 60);
    }

    #[test]
    fn test_settle_penalty_capped_at_deposit() {
        let input = SettlementInput {
            rent: 1000,
            care_deposit: 4,
            restocked: false,
            unit_price_now: 50,
        };
        let s = settle(input, &FeeConfig::default(), SettlementPath::Lister, 10).unwrap();
        assert_eq!(s.penalty, 4);
        assert_eq!(s.tenant_refund, 0);
        assert_eq!(s.total_paid(), 1004);
    }
}
