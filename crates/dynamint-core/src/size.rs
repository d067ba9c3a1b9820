//! Item size accounting.
//!
//! Two sizing modes share one recursion: the *capacity* mode (attribute
//! names count at their byte length, values at their raw size) and the
//! *storage* mode (`compress`), which charges one byte per attribute name
//! plus per-type storage overheads and underlies the key-validity and
//! metadata accounting.

use dynamint_model::attribute_value::AttributeValue;
use dynamint_model::decimal::Decimal;
use dynamint_model::types::Item;

/// Hard limit on the capacity-mode size of a stored item.
pub const MAX_ITEM_SIZE_BYTES: u64 = 400 * 1024;

/// Size of an item.
///
/// With `compress`, the attribute named by `range_key` is excluded from the
/// sum and tracked separately; it re-enters through the metadata term. The
/// carve-out applies only at the top level, never inside nested maps.
///
/// With `add_meta_size` the result becomes
/// `2 + size + ceil((1 + size) / 3072) * (18 + range_key_size)`.
#[must_use]
pub fn item_size(item: &Item, compress: bool, add_meta_size: bool, range_key: Option<&str>) -> u64 {
    let mut range_key_size = 0u64;
    let mut size = 0u64;
    for (name, value) in item {
        let is_range_key = compress && range_key == Some(name.as_str());
        let value_size = value_size_with_storage(value, compress && !is_range_key);
        if is_range_key {
            range_key_size = value_size;
            continue;
        }
        size += value_size + if compress { 1 } else { name.len() as u64 };
    }
    if add_meta_size {
        2 + size + (1 + size).div_ceil(3072) * (18 + range_key_size)
    } else {
        size
    }
}

/// Value size plus, in compressed mode, the per-type storage overhead.
#[must_use]
pub fn value_size_with_storage(value: &AttributeValue, compress: bool) -> u64 {
    let size = value_size(value, compress);
    if !compress {
        return size;
    }
    match value {
        AttributeValue::S(_) => {
            size + if size < 128 {
                1
            } else if size < 16384 {
                2
            } else {
                3
            }
        }
        AttributeValue::B(_) | AttributeValue::N(_) => size + 1,
        AttributeValue::Ss(set) => size + set.len() as u64 + 1,
        AttributeValue::Ns(set) => size + set.len() as u64 + 1,
        AttributeValue::Bs(set) => size + set.len() as u64 + 1,
        AttributeValue::Bool(_) | AttributeValue::Null(_) => 1,
        AttributeValue::L(_) | AttributeValue::M(_) => size,
    }
}

fn value_size(value: &AttributeValue, compress: bool) -> u64 {
    match value {
        AttributeValue::S(s) => s.len() as u64,
        AttributeValue::B(b) => b.len() as u64,
        AttributeValue::N(n) => number_size(n),
        AttributeValue::Ss(set) => set.iter().map(|s| s.len() as u64).sum(),
        AttributeValue::Ns(set) => set.iter().map(|n| number_size(n)).sum(),
        AttributeValue::Bs(set) => set.iter().map(|b| b.len() as u64).sum(),
        AttributeValue::Bool(_) | AttributeValue::Null(_) => 1,
        AttributeValue::L(list) => {
            3 + list
                .iter()
                .map(|v| 1 + value_size_with_storage(v, compress))
                .sum::<u64>()
        }
        AttributeValue::M(entries) => {
            // Nested maps size like items; the range-key carve-out does not
            // recurse.
            let as_item: Item = entries.clone();
            3 + entries.len() as u64 + item_size(&as_item, compress, false, None)
        }
    }
}

/// Digit-based size of a number: one byte, half a byte per digit rounded
/// up, and a sign byte for negatives.
fn number_size(n: &str) -> u64 {
    let Ok(num) = Decimal::parse(n) else {
        return 1;
    };
    let digits = num.digits().len() as u64;
    1 + digits.div_ceil(2) + u64::from(num.is_negative())
}

/// Capacity units consumed by an operation touching `item`.
///
/// A missing item counts as one byte. Reads divide by 4, and an eventually
/// consistent read is charged at half rate.
#[must_use]
pub fn capacity_units(item: Option<&Item>, is_read: bool, consistent: bool) -> f64 {
    let size = item.map_or(1, |i| item_size(i, false, false, None).max(1));
    let divisor = if is_read { 4 * 1024 } else { 1024 };
    #[allow(clippy::cast_precision_loss)]
    let units = size.div_ceil(divisor) as f64;
    if is_read && !consistent {
        units / 2.0
    } else {
        units
    }
}
