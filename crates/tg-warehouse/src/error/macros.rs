/// Creates a crate-level [`Error`](crate::Error) from a path to a variant of any
/// error enum convertible into [`ErrorKind`](crate::ErrorKind) and the variant's
/// fields. Each field value goes through an [`Into`] conversion, and a field
/// without a value is taken from a variable of the same name.
///
/// ```ignore
/// err!(DetectionError::ReadDetections { path, source })
/// ```
macro_rules! err {
    (@val $field_ident:ident $field_val:expr) => ($field_val);
    (@val $field_ident:ident) => ($field_ident);
    ($variant_path:path $({
        $( $field_ident:ident $(: $field_val:expr)? ),*
        $(,)?
    })?) => {{
        use $variant_path as Variant;

        $crate::error::Error::from(
            Variant $({$(
                $field_ident: ::std::convert::Into::into(
                    $crate::error::err!(@val $field_ident $($field_val)?)
                )
            ),*})?
        )
    }};
}

/// Makes a closure for `map_err` that puts the error it receives into the
/// `source` field of the given variant.
macro_rules! err_ctx {
    ($variant_path:path $({ $($variant_fields:tt)* })?) => {
        |source| $crate::error::err!($variant_path { source, $($($variant_fields)*)? })
    };
}

/// Returns early with an [`Err`] built via [`err!`]
macro_rules! bail {
    ($($err:tt)*) => {
        return ::std::result::Result::Err($crate::error::err!($($err)*))
    };
}

pub(crate) use bail;
pub(crate) use err;
pub(crate) use err_ctx;
