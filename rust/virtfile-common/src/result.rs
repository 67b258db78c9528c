pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns `InvalidArgument` from the enclosing function when `$cond` is false.
/// The error names the argument and quotes the failed condition.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::result::argument_violation(stringify!($name), stringify!($cond)).into());
        }
    };
}

/// Same as [`verify_arg!`], for conditions on decoded or supplied data, failing
/// with `InvalidFormat`.
#[macro_export]
macro_rules! verify_data {
    ($name:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::result::data_violation(stringify!($name), stringify!($cond)).into());
        }
    };
}

#[cold]
#[doc(hidden)]
pub fn argument_violation(name: &str, condition: &str) -> crate::error::Error {
    crate::error::Error::invalid_arg(name, condition)
}

#[cold]
#[doc(hidden)]
pub fn data_violation(element: &str, condition: &str) -> crate::error::Error {
    crate::error::Error::invalid_data(element, condition)
}
