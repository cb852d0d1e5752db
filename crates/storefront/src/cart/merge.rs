//! Line conflict rule for merging a guest cart into an authenticated cart.

use cartbridge_core::{CartItem, QuantityError};

/// Fold `guest` lines into `authenticated` lines.
///
/// A product present on both sides keeps the authenticated line (its ID,
/// unit price and product data) with the two quantities summed. Products
/// only in the guest cart are appended in guest order, priced as the guest
/// line was.
///
/// # Errors
///
/// Returns `TooLarge` if a summed line would exceed the line maximum. No
/// partial result is produced.
pub fn merge_into(
    authenticated: &[CartItem],
    guest: &[CartItem],
) -> Result<Vec<CartItem>, QuantityError> {
    let mut merged = authenticated.to_vec();
    for incoming in guest {
        match merged
            .iter_mut()
            .find(|line| line.product_id == incoming.product_id)
        {
            Some(line) => line.quantity = line.quantity.checked_add(incoming.quantity)?,
            None => merged.push(incoming.clone()),
        }
    }
    Ok(merged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartbridge_core::{CurrencyCode, Price, ProductId, ProductSnapshot, Quantity};
    use rust_decimal::Decimal;

    use super::*;

    fn line(product: &str, quantity: u32, cents: i64) -> CartItem {
        CartItem::new(
            ProductId::parse(product).unwrap(),
            Quantity::new(quantity).unwrap(),
            Price::new(Decimal::new(cents, 2), CurrencyCode::USD),
            ProductSnapshot {
                name: product.to_uppercase(),
                image: None,
                sku: None,
            },
        )
    }

    fn quantities(items: &[CartItem]) -> Vec<(&str, u32)> {
        items
            .iter()
            .map(|i| (i.product_id.as_str(), i.quantity.get()))
            .collect()
    }

    #[test]
    fn test_overlapping_product_sums_quantities() {
        let authenticated = vec![line("a", 1, 1000), line("b", 1, 500)];
        let guest = vec![line("a", 2, 900)];

        let merged = merge_into(&authenticated, &guest).unwrap();
        assert_eq!(quantities(&merged), vec![("a", 3), ("b", 1)]);
    }

    #[test]
    fn test_authenticated_price_wins() {
        let authenticated = vec![line("a", 1, 1000)];
        let guest = vec![line("a", 1, 900), line("c", 1, 300)];

        let merged = merge_into(&authenticated, &guest).unwrap();
        assert_eq!(merged[0].unit_price.amount, Decimal::new(1000, 2));
        assert_eq!(merged[0].id, authenticated[0].id);
        assert_eq!(merged[1].unit_price.amount, Decimal::new(300, 2));
    }

    #[test]
    fn test_empty_sides() {
        let guest = vec![line("a", 2, 100)];
        assert_eq!(quantities(&merge_into(&[], &guest).unwrap()), vec![("a", 2)]);
        assert_eq!(quantities(&merge_into(&guest, &[]).unwrap()), vec![("a", 2)]);
        assert!(merge_into(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_sum_over_line_maximum_is_rejected() {
        let authenticated = vec![line("a", 5, 100)];
        let guest = vec![line("a", Quantity::MAX, 100)];
        assert!(matches!(
            merge_into(&authenticated, &guest),
            Err(QuantityError::TooLarge(10_004))
        ));
    }
}
