// models/src/labels.rs

/// An enum persisted as its numeric index with a human readable label for
/// every member.
pub trait Labeled: Sized + Copy + 'static {
    /// Name of the enum used in error messages.
    const KIND: &'static str;
    /// Every member, in index order.
    const ALL: &'static [Self];

    fn index(self) -> u8;
    fn from_index(index: u8) -> Option<Self>;
    fn label(self) -> &'static str;

    /// Case-insensitive lookup by label, used by imports and query strings.
    fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|member| member.label().eq_ignore_ascii_case(wanted))
    }

    /// `(index, label)` pairs for select inputs.
    fn options() -> Vec<(u8, &'static str)> {
        Self::ALL.iter().map(|m| (m.index(), m.label())).collect()
    }
}

/// Declares an enum stored as a `u8` index, together with its `Labeled`
/// impl. The label and index maps are generated as exhaustive matches.
#[macro_export]
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($kind:literal) {
            $($variant:ident = $index:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::labels::Labeled for $name {
            const KIND: &'static str = $kind;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn index(self) -> u8 {
                match self {
                    $($name::$variant => $index),+
                }
            }

            fn from_index(index: u8) -> Option<Self> {
                match index {
                    $($index => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::errors::ValidationError;

            fn try_from(index: u8) -> Result<Self, Self::Error> {
                <$name as $crate::labels::Labeled>::from_index(index).ok_or(
                    $crate::errors::ValidationError::InvalidEnumIndex { kind: $kind, index },
                )
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                $crate::labels::Labeled::index(value)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::labels::Labeled::label(*self))
            }
        }
    };
}
