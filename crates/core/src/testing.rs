//! Shared test strategies.

use proptest::prelude::*;

/// Well-formed infix expressions over small integers, nested up to five
/// operators deep, with and without grouping parentheses.
pub fn expression_text() -> impl Strategy<Value = String> {
    let leaf = (0u32..50).prop_map(|n| n.to_string());
    leaf.prop_recursive(5, 64, 2, |inner| {
        let operator = prop::sample::select(vec!['+', '-', '*', '/']);
        prop_oneof![
            (inner.clone(), operator.clone(), inner.clone())
                .prop_map(|(left, op, right)| format!("{left} {op} {right}")),
            (inner.clone(), operator, inner)
                .prop_map(|(left, op, right)| format!("({left}){op}({right})")),
        ]
    })
}

/// Equal up to rounding; infinities and NaN must match exactly.
pub fn close(a: f64, b: f64) -> bool {
    if a.is_finite() && b.is_finite() {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    } else {
        a == b || (a.is_nan() && b.is_nan())
    }
}
