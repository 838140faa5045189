use crate::error;

pub type Result<T> = ::std::result::Result<T, error::Error>;

#[macro_export]
macro_rules! io_err {
    ($kind:ident, $msg:expr) => {
        ::std::io::Error::new(::std::io::ErrorKind::$kind, $msg)
    };
}

#[macro_export]
macro_rules! res {
    ($err:expr) => {
        Err(From::from($err))
    };
}

/// Join the components of a root-relative path into a `/`-separated selector.
///
/// The result always starts with `/`, independent of the host's separator.
pub fn to_selector(relative: &std::path::Path) -> String {
    let mut selector = String::new();
    for component in relative.components() {
        selector.push('/');
        selector.push_str(&component.as_os_str().to_string_lossy());
    }
    if selector.is_empty() {
        selector.push('/');
    }
    selector
}

/// Whether a selector or display string can be placed in a tab-delimited line.
pub fn is_line_safe(field: &str) -> bool {
    !field.contains(['\t', '\r', '\n'])
}
