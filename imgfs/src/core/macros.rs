// SPDX-License-Identifier: MIT

/// Wires the layered error enums together.
///
/// - `top`: every layer converts into the top-level error variant.
/// - `str_into`: `&'static str` converts into each layer's `Other`.
/// - `sub`: lower layers convert into the matching variant of higher layers.
#[macro_export]
macro_rules! fs_error_wiring {
    (
        top => $top:ty {
            $($top_src:ty : $top_variant:ident),+ $(,)?
        },
        str_into => [ $($str_tgt:ty),* $(,)? ],
        sub => {
            $($src_sub:ty => [ $($dst_sub:ident::$dst_variant:ident),+ ] ),* $(,)?
        } $(,)?
    ) => {
        $(
            impl From<$top_src> for $top {
                #[inline]
                fn from(e: $top_src) -> Self { <$top>::$top_variant(e) }
            }
        )+

        $(
            impl From<&'static str> for $str_tgt {
                #[inline]
                fn from(msg: &'static str) -> Self { <$str_tgt>::Other(msg) }
            }
        )*
        impl From<&'static str> for $top {
            #[inline]
            fn from(msg: &'static str) -> Self { <$top>::Other(msg) }
        }

        $(
            $(
                impl From<$src_sub> for $dst_sub {
                    #[inline]
                    fn from(e: $src_sub) -> Self { <$dst_sub>::$dst_variant(e) }
                }
            )+
        )*
    };
}

/// Returns early with the given error converted into the function's error type.
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err(($err).into())
    };
}

/// Returns early with `$err` unless `$cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
}
