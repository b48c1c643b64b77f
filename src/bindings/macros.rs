//! `protocol_enum!`: typed Rust enums for protocol enumerations.

/// Define a Rust enum mirroring a protocol enumeration.
///
/// Generates the enum plus `NAME`, `KIND`, `ALL`, `value()`, `wire_value()`,
/// `since()`, `deprecated_since()`, `from_wire()`, `is_valid()` and
/// `descriptor()`. Validation goes through the shared table-driven validator,
/// so the typed and descriptor paths cannot disagree.
///
/// ```
/// objwire::protocol_enum! {
///     /// Pointer buttons.
///     pub enum Button("button", Bitfield) {
///         "left" => Left = 0x1, since 1;
///         "right" => Right = 0x2, since 1;
///         "middle" => Middle = 0x4, since 2;
///     }
/// }
///
/// assert!(Button::is_valid(0x3, 1));
/// assert!(!Button::is_valid(0x4, 1));
/// assert_eq!(Button::from_wire(0x4, 2), Some(Button::Middle));
/// ```
#[macro_export]
macro_rules! protocol_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $ty:ident ($name:literal, $kind:ident) {
            $(
                $(#[$vmeta:meta])*
                $wire:literal => $variant:ident = $value:expr, since $since:literal
                    $(, deprecated $deprecated:literal)? ;
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $ty {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $ty {
            /// Protocol name of the enumeration.
            pub const NAME: &'static str = $name;
            pub const KIND: $crate::protocol::EnumKind = $crate::protocol::EnumKind::$kind;
            /// Every member, in declaration order.
            pub const ALL: &'static [$ty] = &[ $( $ty::$variant ),+ ];

            /// Declared value.
            pub const fn value(self) -> i64 {
                match self {
                    $( $ty::$variant => $value, )+
                }
            }

            /// Value as it appears on the wire.
            pub const fn wire_value(self) -> u32 {
                self.value() as u32
            }

            /// First interface version carrying this member.
            pub const fn since(self) -> u32 {
                match self {
                    $( $ty::$variant => $since, )+
                }
            }

            pub const fn deprecated_since(self) -> Option<u32> {
                match self {
                    $( $ty::$variant => $crate::protocol_enum!(@deprecated $($deprecated)?), )+
                }
            }

            /// The member whose wire value is `value`, if it exists at `version`.
            pub fn from_wire(value: u32, version: u32) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|member| member.wire_value() == value && version >= member.since())
            }

            /// Whether `value` is legal at `version`.
            pub fn is_valid(value: u32, version: u32) -> bool {
                $crate::protocol::validator::accepts(
                    Self::KIND,
                    Self::ALL.iter().map(|member| (member.wire_value(), member.since())),
                    value,
                    version,
                )
            }

            /// Runtime descriptor of the enumeration.
            pub fn descriptor() -> $crate::protocol::Enumeration {
                let mut enumeration = $crate::protocol::Enumeration::new($name, Self::KIND);
                $(
                    let mut entry = $crate::protocol::EnumEntry::new($wire, $ty::$variant.value(), $since);
                    if let Some(since) = $ty::$variant.deprecated_since() {
                        entry = entry.deprecated(since);
                    }
                    enumeration = enumeration.entry(entry);
                )+
                enumeration
            }
        }

        impl From<$ty> for u32 {
            fn from(member: $ty) -> u32 {
                member.wire_value()
            }
        }
    };
    (@deprecated) => { None };
    (@deprecated $since:literal) => { Some($since) };
}
