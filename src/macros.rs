/// Macro for tracking the exponentiations a code block issues
#[macro_export]
macro_rules! track_modexps {
    ($counter:expr, $operation_name:expr, $log_target:expr, $code:expr) => {{
        let counter = $counter;
        let initial_modexps = $crate::batching::ModExp::modexp_count(counter);

        let result = $code;

        let modexps_issued = $crate::batching::ModExp::modexp_count(counter) - initial_modexps;

        tracing::info!(
            target: $log_target,
            operation = $operation_name,
            modexps_issued,
            "Exponentiation tracking"
        );

        result
    }};
}
