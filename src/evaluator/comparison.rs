use crate::core::{CompareOp, DataType, DbError, Result, Value};

/// Evaluate `left op right`. Any comparison involving `NULL` is false.
pub fn compare(left: &Value, op: CompareOp, right: &Value) -> Result<bool> {
    Ok(left.compare(right)?.is_some_and(|ordering| op.holds(ordering)))
}

/// Reject a comparison between a field of type `left` and `right` before any
/// row is read.
pub fn check_literal(column: &str, left: DataType, right: &Value) -> Result<()> {
    if left.is_compatible(right) {
        Ok(())
    } else {
        Err(DbError::TypeMismatch(format!(
            "Cannot compare {} ({}) with {} literal {}",
            column,
            left,
            right.type_name(),
            right
        )))
    }
}

pub fn check_columns(left_name: &str, left: DataType, right_name: &str, right: DataType) -> Result<()> {
    if left == right {
        Ok(())
    } else {
        Err(DbError::TypeMismatch(format!(
            "Cannot compare {} ({}) with {} ({})",
            left_name, left, right_name, right
        )))
    }
}
