//! Helper macros used by the decoder.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// ```ignore
/// ensure!(body_len <= MAX_BODY_BYTES, ParseError::too_large_body(body_len, MAX_BODY_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
