//! Task ID pairing.
//!
//! Every task needs a single flat integer ID that agents can echo back, yet
//! the coordinator must recover the owning expression from it without a side
//! table. An order-sensitive pairing function over `(expression, operation)`
//! provides exactly that: each pair maps to a distinct `u64`, independent of
//! how many operations any other expression has.

/// Encode an `(expression, operation)` pair into a task ID.
///
/// Inputs are `u32` so the result always fits: the largest pair maps to
/// `u64::MAX`.
pub fn encode(expression: u32, operation: u32) -> u64 {
    let n = u64::from(expression);
    let m = u64::from(operation);
    if n >= m { n * n + n + m } else { m * m + n }
}

/// Decode a task ID back into its `(expression, operation)` pair.
///
/// Total over `u64`: any integer decodes to some pair, and
/// `decode(encode(a, b)) == (a, b)` for every `a, b`.
pub fn decode(task_id: u64) -> (u32, u32) {
    let q = task_id.isqrt();
    let l = task_id - q * q;
    // q <= u32::MAX and l <= 2q, so both branches fit in u32.
    let (n, m) = if l < q { (l, q) } else { (q, l - q) };
    (n as u32, m as u32)
}
