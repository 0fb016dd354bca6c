//! `sum`, `subtract`, `multiply`, `divide`: left folds under the numeric
//! coercion rules.

use tether_core::Value;

use crate::numeric::{arithmetic, numeric, ArithOp};

/// Fold all parameters with `op`. The first operand is normalized to its
/// numeric reading, so `sum('2')` is `2`. Any non-numeric operand makes the
/// result `Null`, and the fold stops there.
pub(crate) fn fold(op: ArithOp, params: &[Value]) -> Value {
    let Some((first, rest)) = params.split_first() else {
        return Value::Null;
    };
    let Some(start) = numeric(first) else {
        return Value::Null;
    };
    let mut acc = start.into_value();
    for operand in rest {
        acc = arithmetic(op, &acc, operand);
        if acc.is_null() {
            return Value::Null;
        }
    }
    acc
}
