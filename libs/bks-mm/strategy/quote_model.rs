//! Pure quote-model math (C4): self-exclusion of own resting volume from
//! the observed book, then the inventory-skewed symmetric quote formula.
//! Kept free of I/O so it can be tested directly against the concrete
//! scenarios named in SPEC_FULL.md §8.

use crate::config::StrategyConfig;
use crate::domain::{Instrument, Order, OrderBookSnapshot, OrderSide, PriceLevel, TargetQuote, TargetSide};

/// Subtracts the trader's own resting volume from each price level and
/// returns the first level (walking away from the touch) where external
/// volume remains. Idempotent and monotone: adding more of the trader's
/// own volume at a level can only push the reported top further from the
/// touch, never closer.
pub fn external_top(
    book_side: &[PriceLevel],
    own_quantity_by_price: impl Fn(f64) -> u64,
) -> Option<PriceLevel> {
    book_side.iter().find_map(|level| {
        let own = own_quantity_by_price(level.price);
        let external = level.quantity.saturating_sub(own);
        (external > 0).then_some(PriceLevel {
            price: level.price,
            quantity: external,
        })
    })
}

/// Builds the lookup closure `external_top` needs from the set of orders
/// the engine currently has resting on one side of the book.
pub fn own_quantity_lookup(resting: &[Order], side: OrderSide) -> impl Fn(f64) -> u64 + '_ {
    move |price: f64| {
        resting
            .iter()
            .filter(|o| o.side == side && (o.price - price).abs() < 1e-9)
            .map(|o| o.quantity)
            .sum()
    }
}

fn quantize(price: f64, tick_size: f64) -> f64 {
    (price / tick_size).round() * tick_size
}

/// Computes the target quote pair for one tick. `best_bid`/`best_ask` must
/// already have self-exclusion applied (see [`external_top`]).
pub fn compute_target_quote(
    instrument: Instrument,
    best_bid: Option<PriceLevel>,
    best_ask: Option<PriceLevel>,
    inventory: i64,
    params: &StrategyConfig,
) -> TargetQuote {
    let (Some(best_bid), Some(best_ask)) = (best_bid, best_ask) else {
        return TargetQuote {
            instrument,
            bid: None,
            ask: None,
        };
    };

    let mid = (best_bid.price + best_ask.price) / 2.0;
    let skew = params.inventory_k * inventory as f64;
    let center = mid - skew;

    let bid_price = quantize(
        (center - params.spread / 2.0).min(best_bid.price),
        params.tick_size,
    );
    let ask_price = quantize(
        (center + params.spread / 2.0).max(best_ask.price),
        params.tick_size,
    );

    let scale = (1.0 - (inventory.unsigned_abs() as f64) / (params.inventory_limit.unsigned_abs() as f64))
        .max(0.1);

    let bid_size = if inventory > 0 {
        ((params.base_size as f64 * scale).round() as u64).max(1)
    } else {
        params.base_size.max(1)
    };
    let ask_size = if inventory < 0 {
        ((params.base_size as f64 * scale).round() as u64).max(1)
    } else {
        params.base_size.max(1)
    };

    let bid = (inventory < params.inventory_limit).then_some(TargetSide {
        price: bid_price,
        quantity: bid_size,
    });
    let ask = (inventory > -params.inventory_limit).then_some(TargetSide {
        price: ask_price,
        quantity: ask_size,
    });

    TargetQuote { instrument, bid, ask }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StrategyConfig {
        StrategyConfig {
            spread: 0.30,
            base_size: 1,
            inventory_limit: 5,
            inventory_k: 0.1,
            min_edit_delta: 0.10,
            tick_size: 0.01,
        }
    }

    fn bid(price: f64, qty: u64) -> Option<PriceLevel> {
        Some(PriceLevel { price, quantity: qty })
    }

    // S1 — cold start, flat inventory.
    #[test]
    fn s1_cold_start_flat_inventory() {
        let target = compute_target_quote(
            Instrument::new("SBER", "TQBR"),
            bid(100.00, 10),
            bid(100.50, 10),
            0,
            &params(),
        );
        assert_eq!(target.bid.unwrap().price, 100.00);
        assert_eq!(target.ask.unwrap().price, 100.50);
        assert_eq!(target.bid.unwrap().quantity, 1);
        assert_eq!(target.ask.unwrap().quantity, 1);
    }

    // S2 — inventory-skewed.
    #[test]
    fn s2_inventory_skewed() {
        let target = compute_target_quote(
            Instrument::new("SBER", "TQBR"),
            bid(100.00, 10),
            bid(100.50, 10),
            3,
            &params(),
        );
        assert!((target.bid.unwrap().price - 99.80).abs() < 1e-9);
        assert!((target.ask.unwrap().price - 100.50).abs() < 1e-9);
        assert_eq!(target.bid.unwrap().quantity, 1);
        assert_eq!(target.ask.unwrap().quantity, 1);
    }

    // S3 — inventory at limit suppresses the worsening side.
    #[test]
    fn s3_inventory_at_limit_suppresses_bid() {
        let target = compute_target_quote(
            Instrument::new("SBER", "TQBR"),
            bid(100.00, 10),
            bid(100.50, 10),
            5,
            &params(),
        );
        assert!(target.bid.is_none());
        assert!(target.ask.is_some());
    }

    #[test]
    fn inventory_at_negative_limit_suppresses_ask() {
        let target = compute_target_quote(
            Instrument::new("SBER", "TQBR"),
            bid(100.00, 10),
            bid(100.50, 10),
            -5,
            &params(),
        );
        assert!(target.ask.is_none());
        assert!(target.bid.is_some());
    }

    // S5 — self-exclusion: own volume fully covers the top bid level.
    #[test]
    fn s5_self_exclusion_skips_fully_own_level() {
        let levels = vec![PriceLevel { price: 100.00, quantity: 10 }];
        let own = |price: f64| if (price - 100.00).abs() < 1e-9 { 10 } else { 0 };
        assert_eq!(external_top(&levels, own), None);
    }

    #[test]
    fn self_exclusion_is_monotone() {
        let levels = vec![PriceLevel { price: 100.00, quantity: 10 }];
        let own_small = |_: f64| 3u64;
        let own_large = |_: f64| 8u64;
        let small = external_top(&levels, own_small).unwrap();
        let large = external_top(&levels, own_large).unwrap();
        assert!(large.quantity <= small.quantity);
    }

    // P3 — never crosses the inside.
    #[test]
    fn target_never_crosses_inside() {
        let target = compute_target_quote(
            Instrument::new("SBER", "TQBR"),
            bid(100.00, 10),
            bid(100.05, 10),
            4,
            &params(),
        );
        assert!(target.bid.unwrap().price <= 100.00);
        assert!(target.ask.unwrap().price >= 100.05);
    }
}
