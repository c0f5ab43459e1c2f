#[macro_export]
macro_rules! log_err {
    ($expr:expr, $($arg:tt)+) => {
        if let Err(err) = $expr {
            log::error!($($arg)+, err = err);
        }
    };
}
