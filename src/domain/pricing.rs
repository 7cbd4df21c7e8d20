use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Financial split of a booking.
///
/// Amounts are summed exactly and the commission is rounded once, to two
/// decimal places, half away from zero. The provider's share is whatever is
/// left of the subtotal, so `commission_amount + provider_earnings` always
/// equals `subtotal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub service_price: Decimal,
    pub addons_price: Decimal,
    pub subtotal: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub provider_earnings: Decimal,
}

impl PriceQuote {
    /// `addons` holds `(unit_price, quantity)` pairs.
    pub fn compute<I>(service_price: Decimal, addons: I, commission_rate: Decimal) -> Self
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let addons_price: Decimal = addons
            .into_iter()
            .map(|(price, quantity)| price * Decimal::from(quantity))
            .sum();
        let subtotal = service_price + addons_price;
        let commission_amount = (subtotal * commission_rate / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Self {
            service_price,
            addons_price,
            subtotal,
            commission_rate,
            commission_amount,
            provider_earnings: subtotal - commission_amount,
        }
    }
}
