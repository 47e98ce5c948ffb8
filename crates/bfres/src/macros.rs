//! Declares enumerations stored as raw integers.
//!
//! Conversion from the raw value fails with [`crate::error::Error::InvalidEnumValue`], naming the
//! enumeration and the offending value.

macro_rules! res_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $repr:ty {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr($repr)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl TryFrom<$repr> for $name {
            type Error = $crate::error::Error;

            fn try_from(value: $repr) -> $crate::error::Result<Self> {
                match value {
                    $(raw if raw == $value => Ok($name::$variant),)*
                    _ => Err($crate::error::Error::InvalidEnumValue {
                        name: stringify!($name),
                        value: value as u32,
                    }),
                }
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value as $repr
            }
        }
    };
}
