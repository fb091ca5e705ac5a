//! Newtype string identifiers for type-safe cart keys.
//!
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! mixing a product id with a size label. Both are opaque strings handed out
//! by the backend; the only thing checked here is that they are non-empty and
//! of sane length.

/// Errors that can occur when parsing an identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input is empty or whitespace only.
    #[error("identifier cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("identifier must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// Maximum identifier length accepted from storage or the network.
pub const MAX_ID_LENGTH: usize = 256;

/// Validate a raw identifier string.
///
/// # Errors
///
/// Returns [`IdError`] if the input is blank or longer than [`MAX_ID_LENGTH`].
pub fn check_id(raw: &str) -> Result<(), IdError> {
    if raw.trim().is_empty() {
        return Err(IdError::Empty);
    }
    if raw.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong { max: MAX_ID_LENGTH });
    }
    Ok(())
}

/// Macro to define a type-safe string identifier.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` going through [`check_id`]
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `parse()`, `as_str()`, `into_inner()`
/// - `Display`, `FromStr`, `AsRef<str>` and `Borrow<str>` so maps keyed by
///   the id can be queried with a plain `&str`
///
/// # Example
///
/// ```rust
/// # use pawpal_core::define_id;
/// define_id!(PetId);
/// define_id!(ClinicId);
///
/// let pet = PetId::parse("rex").unwrap();
/// assert_eq!(pet.as_str(), "rex");
/// assert!(ClinicId::parse("").is_err());
///
/// // These are different types, so this won't compile:
/// // let _: PetId = ClinicId::parse("north").unwrap();
/// ```
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, rejecting blank or oversized input.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is empty or too long.
            pub fn parse(id: impl Into<String>) -> ::core::result::Result<Self, $crate::IdError> {
                let id = id.into();
                $crate::types::id::check_id(&id)?;
                Ok(Self(id))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl ::core::convert::TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(id: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Opaque product identifier matching a catalog entry (`_id` on the wire).
    ProductId
);

define_id!(
    /// Opaque product variant key, e.g. `"M"` or `"Large breed"`.
    SizeLabel
);

impl SizeLabel {
    /// Variant label used for products that have no meaningful sizes.
    pub const ONE_SIZE: &'static str = "one-size";

    /// The sentinel label for size-less products.
    #[must_use]
    pub fn one_size() -> Self {
        Self(Self::ONE_SIZE.to_owned())
    }
}
