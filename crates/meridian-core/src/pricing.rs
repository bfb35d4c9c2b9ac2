//! # Cart Pricing
//!
//! Decimal-safe cart arithmetic: subtotal, discount (with role-aware caps),
//! tax, and total.
//!
//! ## Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        price_cart()                                     │
//! │                                                                         │
//! │  lines ──► subtotal = Σ (unit_price × qty − line_discount)              │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  discount ──► resolve Fixed/Percent to an amount                        │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  role cap ──► clamp to subtotal × cap% (cashier default 10%)            │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  tax = subtotal × branch rate                   (round half up)         │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  total = subtotal − discount + tax                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cap is applied to the resolved amount, so a cashier entering a fixed
//! discount of $50 on a $100 cart gets exactly the same clamp as one entering
//! 50%: both end at $10.00 under the default 10% cap.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::money::{Money, Rate};
use crate::types::Role;
use crate::{DEFAULT_CASHIER_DISCOUNT_CAP_BPS, MAX_CART_LINES, MAX_LINE_QUANTITY};

/// One line of an in-progress cart, as submitted to the commit workflow.
///
/// Unit prices are resolved server-side from the product catalog before
/// pricing; the line carries them so the priced cart and the persisted sale
/// items come from the same frozen values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Line-level discount in cents; zero for most lines.
    #[serde(default)]
    pub discount_cents: i64,
}

impl CartLine {
    /// Gross amount before the line discount.
    #[inline]
    pub fn gross_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Line total: unit_price × quantity − discount.
    #[inline]
    pub fn total_cents(&self) -> i64 {
        self.gross_cents() - self.discount_cents
    }
}

/// Cart-level discount as entered by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Discount {
    None,
    /// Fixed amount in cents.
    Fixed(i64),
    /// Percentage of the subtotal, in basis points.
    Percent(u32),
}

impl Default for Discount {
    fn default() -> Self {
        Discount::None
    }
}

/// Role-aware discount caps.
///
/// Cashiers are capped; managers and admins are not. The cap is a deployment
/// configuration value injected into the workflow, never process-global
/// state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Maximum discount a cashier may apply, as bps of the subtotal.
    pub cashier_cap_bps: u32,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        DiscountPolicy {
            cashier_cap_bps: DEFAULT_CASHIER_DISCOUNT_CAP_BPS,
        }
    }
}

impl DiscountPolicy {
    /// The cap for a given role, if any.
    pub fn cap_for(&self, role: Role) -> Option<Rate> {
        match role {
            Role::Cashier => Some(Rate::from_bps(self.cashier_cap_bps)),
            Role::Manager | Role::Admin => None,
        }
    }
}

/// The result of pricing a cart. All values in cents, rounded half up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedCart {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// Prices a cart: subtotal, capped discount, tax, total.
///
/// ## Errors
/// Returns `ValidationError` for an empty/oversized cart, non-positive
/// quantities, negative amounts, or a line discount exceeding its line.
///
/// ## Example
/// ```rust
/// use meridian_core::pricing::{price_cart, CartLine, Discount, DiscountPolicy};
/// use meridian_core::money::Rate;
/// use meridian_core::types::Role;
///
/// let lines = vec![CartLine {
///     product_id: "p1".into(),
///     quantity: 2,
///     unit_price_cents: 450,
///     discount_cents: 0,
/// }];
/// let priced = price_cart(
///     &lines,
///     Rate::from_percent(5),
///     Discount::None,
///     Role::Cashier,
///     &DiscountPolicy::default(),
/// )
/// .unwrap();
/// assert_eq!(priced.subtotal_cents, 900);
/// assert_eq!(priced.tax_cents, 45);
/// assert_eq!(priced.total_cents, 945);
/// ```
pub fn price_cart(
    lines: &[CartLine],
    tax_rate: Rate,
    discount: Discount,
    role: Role,
    policy: &DiscountPolicy,
) -> ValidationResult<PricedCart> {
    validate_lines(lines)?;

    let subtotal = Money::from_cents(lines.iter().map(CartLine::total_cents).sum());

    let requested = match discount {
        Discount::None => Money::zero(),
        Discount::Fixed(cents) => {
            if cents < 0 {
                return Err(ValidationError::MustNotBeNegative {
                    field: "discount".to_string(),
                });
            }
            Money::from_cents(cents)
        }
        Discount::Percent(bps) => subtotal.percent_of(Rate::from_bps(bps)),
    };

    // Clamp to the role cap, then to the subtotal itself. The fixed-amount
    // path goes through the exact same cap computation as the percent path.
    let capped = match policy.cap_for(role) {
        Some(cap) => requested.min(subtotal.percent_of(cap)),
        None => requested,
    };
    let discount_amount = capped.min(subtotal);

    // Tax is computed on the subtotal; the discount reduces what the
    // customer pays, not the taxed base.
    let tax = subtotal.percent_of(tax_rate);
    let total = subtotal - discount_amount + tax;

    Ok(PricedCart {
        subtotal_cents: subtotal.cents(),
        discount_cents: discount_amount.cents(),
        tax_cents: tax.cents(),
        total_cents: total.cents(),
    })
}

fn validate_lines(lines: &[CartLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    if lines.len() > MAX_CART_LINES {
        return Err(ValidationError::CartTooLarge { max: MAX_CART_LINES });
    }

    for line in lines {
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        if line.quantity > MAX_LINE_QUANTITY {
            return Err(ValidationError::QuantityTooLarge {
                requested: line.quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        if line.unit_price_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit_price".to_string(),
            });
        }
        if line.discount_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "line discount".to_string(),
            });
        }
        if line.discount_cents > line.gross_cents() {
            return Err(ValidationError::DiscountExceedsLine {
                discount_cents: line.discount_cents,
                line_cents: line.gross_cents(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, unit_price_cents: i64) -> CartLine {
        CartLine {
            product_id: "p1".to_string(),
            quantity: qty,
            unit_price_cents,
            discount_cents: 0,
        }
    }

    #[test]
    fn prices_simple_cart() {
        // 2 × $4.50 at 5% tax, no discount: 9.00 / 0.45 / 9.45
        let priced = price_cart(
            &[line(2, 450)],
            Rate::from_percent(5),
            Discount::None,
            Role::Cashier,
            &DiscountPolicy::default(),
        )
        .unwrap();

        assert_eq!(priced.subtotal_cents, 900);
        assert_eq!(priced.discount_cents, 0);
        assert_eq!(priced.tax_cents, 45);
        assert_eq!(priced.total_cents, 945);
    }

    #[test]
    fn cashier_fixed_discount_clamped_to_cap() {
        // fixed $50 on a $100 subtotal with the 10% cashier cap → $10.00
        let priced = price_cart(
            &[line(1, 10_000)],
            Rate::zero(),
            Discount::Fixed(5_000),
            Role::Cashier,
            &DiscountPolicy::default(),
        )
        .unwrap();

        assert_eq!(priced.discount_cents, 1_000);
        assert_eq!(priced.total_cents, 9_000);
    }

    #[test]
    fn cashier_percent_discount_clamped_identically() {
        // 50% requested, same cap: identical result to the fixed path
        let priced = price_cart(
            &[line(1, 10_000)],
            Rate::zero(),
            Discount::Percent(5_000),
            Role::Cashier,
            &DiscountPolicy::default(),
        )
        .unwrap();

        assert_eq!(priced.discount_cents, 1_000);
    }

    #[test]
    fn manager_discount_uncapped() {
        let priced = price_cart(
            &[line(1, 10_000)],
            Rate::zero(),
            Discount::Fixed(5_000),
            Role::Manager,
            &DiscountPolicy::default(),
        )
        .unwrap();

        assert_eq!(priced.discount_cents, 5_000);
        assert_eq!(priced.total_cents, 5_000);
    }

    #[test]
    fn discount_never_exceeds_subtotal() {
        let priced = price_cart(
            &[line(1, 500)],
            Rate::zero(),
            Discount::Fixed(10_000),
            Role::Admin,
            &DiscountPolicy::default(),
        )
        .unwrap();

        assert_eq!(priced.discount_cents, 500);
        assert_eq!(priced.total_cents, 0);
    }

    #[test]
    fn tax_is_computed_on_the_subtotal() {
        // $100 at 10% tax with a $10 discount: tax stays $10, total $100
        let priced = price_cart(
            &[line(1, 10_000)],
            Rate::from_percent(10),
            Discount::Fixed(1_000),
            Role::Manager,
            &DiscountPolicy::default(),
        )
        .unwrap();

        assert_eq!(priced.tax_cents, 1_000);
        assert_eq!(priced.total_cents, 10_000);
    }

    #[test]
    fn line_discounts_flow_into_subtotal() {
        let mut discounted = line(2, 450);
        discounted.discount_cents = 100;

        let priced = price_cart(
            &[discounted],
            Rate::zero(),
            Discount::None,
            Role::Cashier,
            &DiscountPolicy::default(),
        )
        .unwrap();

        assert_eq!(priced.subtotal_cents, 800);
    }

    #[test]
    fn rejects_invalid_carts() {
        let policy = DiscountPolicy::default();

        assert!(matches!(
            price_cart(&[], Rate::zero(), Discount::None, Role::Cashier, &policy),
            Err(ValidationError::EmptyCart)
        ));

        assert!(matches!(
            price_cart(&[line(0, 100)], Rate::zero(), Discount::None, Role::Cashier, &policy),
            Err(ValidationError::MustBePositive { .. })
        ));

        assert!(matches!(
            price_cart(&[line(1_000, 100)], Rate::zero(), Discount::None, Role::Cashier, &policy),
            Err(ValidationError::QuantityTooLarge { .. })
        ));

        assert!(matches!(
            price_cart(
                &[line(1, 100)],
                Rate::zero(),
                Discount::Fixed(-5),
                Role::Cashier,
                &policy
            ),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn sale_balance_property_holds() {
        // Σ line totals + tax − discount == total, per the ledger invariant
        let lines = vec![line(2, 450), line(1, 1_099), line(3, 125)];
        let priced = price_cart(
            &lines,
            Rate::from_bps(825),
            Discount::Fixed(200),
            Role::Manager,
            &DiscountPolicy::default(),
        )
        .unwrap();

        let line_sum: i64 = lines.iter().map(CartLine::total_cents).sum();
        assert_eq!(
            line_sum + priced.tax_cents - priced.discount_cents,
            priced.total_cents
        );
    }
}
