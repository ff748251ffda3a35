// src/macros.rs
#[macro_export]
macro_rules! s {
    // Owned string shorthand.
    () => {
        ::std::string::String::new()
    };
    ($expr:expr) => {
        ::std::string::String::from($expr)
    };
}

#[macro_export]
macro_rules! join {
    // Concatenate string-likes into one owned String.
    ($first:expr $(, $rest:expr)+ $(,)?) => {{
        let mut out = ::std::string::String::from($first);
        $(
            out.push_str($rest);
        )+
        out
    }};
}

#[macro_export]
macro_rules! na {
    // The "unknown" cell value used across records and CSV output.
    () => {
        ::std::string::String::from($crate::config::consts::NA)
    };
}
