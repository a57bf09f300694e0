//! Label conversions for fieldless domain enums.
//!
//! ```rust
//! use docket_domain::impl_domain_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Portal,
//!     Email,
//! }
//!
//! impl_domain_label_conversions!(Channel {
//!     Portal => "portal",
//!     Email => "email",
//! });
//!
//! assert_eq!(Channel::Portal.to_string(), "portal");
//! assert_eq!("EMAIL".parse::<Channel>(), Ok(Channel::Email));
//! ```

/// Implements `Display`, case-insensitive `FromStr` and `as_label` for an
/// enum whose variants map one-to-one onto lowercase labels.
#[macro_export]
macro_rules! impl_domain_label_conversions {
    ($enum_name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl $enum_name {
            pub const fn as_label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_label())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
