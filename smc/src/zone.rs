use serde::{Deserialize, Serialize};

use crate::swing::SwingPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumDiscountZone {
    pub start_time: i64,
    pub end_time: i64,
    pub premium_top: f64,
    pub premium_bottom: f64,
    pub equilibrium: f64,
    pub discount_top: f64,
    pub discount_bottom: f64,
}

impl PremiumDiscountZone {
    pub fn in_premium(&self, price: f64) -> bool {
        self.premium_bottom <= price && price <= self.premium_top
    }

    pub fn in_discount(&self, price: f64) -> bool {
        self.discount_bottom <= price && price <= self.discount_top
    }
}

/// Splits the range between the latest swing high and low at its midpoint.
pub fn premium_discount_zone(
    high: Option<&SwingPoint>,
    low: Option<&SwingPoint>,
    end_time: i64,
) -> Option<PremiumDiscountZone> {
    let (high, low) = (high?, low?);
    let top = high.price.max(low.price);
    let bottom = high.price.min(low.price);
    let equilibrium = (top + bottom) / 2.0;
    Some(PremiumDiscountZone {
        start_time: high.time.min(low.time),
        end_time: end_time.max(high.time.max(low.time)),
        premium_top: top,
        premium_bottom: equilibrium,
        equilibrium,
        discount_top: equilibrium,
        discount_bottom: bottom,
    })
}
