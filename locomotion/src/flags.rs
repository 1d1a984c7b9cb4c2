use std::fmt;

use num_traits::{One, PrimInt, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name accepted in configuration files for "every flag of this kind".
pub const ALL_FLAGS_NAME: &str = "All";

/// Trait implemented by flag enums declared through [`define_flags!`].
///
/// The enum's discriminant (via `#[repr(u8)]`) determines the bit index, and the variant
/// name is the spelling used in configuration files.
pub trait FlagBit: Copy + PartialEq + 'static {
    type Storage: PrimInt;

    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    fn bit_index(self) -> u8;

    fn name(self) -> &'static str;

    fn mask(self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|flag| flag.name() == name)
    }
}

/// A set of flags stored as a bitmask.
///
/// Membership is always a direct mask intersection. Configuration files spell the set as a
/// list of variant names; unknown names are dropped with a warning so a typo disables the
/// ability instead of enabling something else.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Flags<F: FlagBit> {
    bits: F::Storage,
}

impl<F: FlagBit> Flags<F> {
    pub fn empty() -> Self {
        Self {
            bits: F::Storage::zero(),
        }
    }

    pub fn all() -> Self {
        Self::from_slice(F::ALL)
    }

    pub fn from_slice(flags: &[F]) -> Self {
        let bits = flags
            .iter()
            .fold(F::Storage::zero(), |acc, flag| acc | flag.mask());
        Self { bits }
    }

    /// Build a set from configuration names. `"All"` selects every flag.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut flags = Self::empty();
        for name in names {
            if name == ALL_FLAGS_NAME {
                flags = Self::all();
                continue;
            }
            match F::from_name(name) {
                Some(flag) => flags.insert(flag),
                None => log::warn!("Ignoring unknown flag name {name:?}"),
            }
        }
        flags
    }

    pub fn bits(&self) -> F::Storage {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == F::Storage::zero()
    }

    pub fn insert(&mut self, flag: F) {
        self.bits = self.bits | flag.mask();
    }

    pub fn remove(&mut self, flag: F) {
        self.bits = self.bits & !flag.mask();
    }

    pub fn contains(&self, flag: F) -> bool {
        (self.bits & flag.mask()) != F::Storage::zero()
    }

    pub fn contains_all(&self, flags: &[F]) -> bool {
        let combined = Self::from_slice(flags).bits;
        (self.bits & combined) == combined
    }

    pub fn contains_any(&self, flags: &[F]) -> bool {
        let combined = Self::from_slice(flags).bits;
        (self.bits & combined) != F::Storage::zero()
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(|flag| self.contains(*flag))
    }
}

impl<F: FlagBit> Default for Flags<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: FlagBit> fmt::Debug for Flags<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(F::name)).finish()
    }
}

impl<F: FlagBit> Serialize for Flags<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(F::name))
    }
}

impl<'de, F: FlagBit> Deserialize<'de> for Flags<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_names(names.iter().map(String::as_str)))
    }
}

/// Declare a flag enum and implement [`FlagBit`] for it.
///
/// Example:
/// ```rust
/// locomotion::define_flags!(Stance, u8, {
///     Standing,
///     Crouched,
/// });
/// ```
#[macro_export]
macro_rules! define_flags {
    ($(#[$meta:meta])* $name:ident, $storage:ty, { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::flags::FlagBit for $name {
            type Storage = $storage;

            const ALL: &'static [Self] = &[$($name::$variant),*];

            fn bit_index(self) -> u8 {
                self as u8
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

define_flags!(
    /// Abilities that gate which movement states can be reached.
    Ability, u16, {
        Jump,
        Sprint,
        Charge,
        Swimming,
        Climbing,
        NoClip,
        PowerSlide,
        Dodge,
        Interact,
    }
);

define_flags!(
    /// Character-relative dodge directions.
    DodgeDirection, u8, {
        Forward,
        Back,
        Left,
        Right,
    }
);

pub type AbilityFlags = Flags<Ability>;
pub type DodgeDirections = Flags<DodgeDirection>;
