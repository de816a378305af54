/// Checks a precondition without panicking.
///
/// On failure the condition is logged at `error` level and the enclosing
/// function returns `$ret`.
macro_rules! soft_assert {
    ($cond:expr, $ret:expr, $($arg:tt)+) => {
        if !($cond) {
            log::error!(
                "soft assertion failed: `{}`: {}",
                stringify!($cond),
                format_args!($($arg)+)
            );
            return $ret;
        }
    };
}

/// Unwraps an `Option`, or logs and returns `$ret` when it is `None`.
macro_rules! soft_unwrap {
    ($opt:expr, $ret:expr, $($arg:tt)+) => {
        match $opt {
            Some(v) => v,
            None => {
                log::error!("soft assertion failed: {}", format_args!($($arg)+));
                return $ret;
            }
        }
    };
}

pub(crate) use soft_assert;
pub(crate) use soft_unwrap;

#[cfg(test)]
mod tests {
    fn halve_even(v: u32) -> Option<u32> {
        soft_assert!(v % 2 == 0, None, "{v} is odd");
        Some(v / 2)
    }

    fn first(items: &[u8]) -> u8 {
        let v = soft_unwrap!(items.first(), 0, "empty slice");
        *v
    }

    #[test]
    fn soft_assert_returns_early() {
        assert_eq!(halve_even(3), None);
        assert_eq!(halve_even(4), Some(2));
    }

    #[test]
    fn soft_unwrap_returns_fallback() {
        assert_eq!(first(&[]), 0);
        assert_eq!(first(&[7, 8]), 7);
    }
}
