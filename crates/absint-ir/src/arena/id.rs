use std::hash::Hash;

use crate::Program;

/// Arena ID
/// an ID object can only be created by
/// `arena.next_id()` or `arena.alloc`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(pub(crate) usize);

impl Id {
    /// return raw ID as usize
    pub fn raw(self) -> usize {
        self.0
    }
}

pub trait Identifier:
    Sized + Clone + Copy + Hash + Ord + std::fmt::Debug + PartialEq + Eq + From<Id> + Into<Id>
{
}

pub trait GetInfo<K>: std::fmt::Debug {
    type Info;
    /// Get a reference to the program info for the given identifier.
    fn get_info<'a>(&self, program: &'a Program<K>) -> Option<&'a Self::Info>;
    /// Get a mutable reference to the program info for the given identifier.
    fn get_info_mut<'a>(&self, program: &'a mut Program<K>) -> Option<&'a mut Self::Info>;
    /// Get a reference to the program info, panicking if not found.
    fn expect_info<'a>(&self, program: &'a Program<K>) -> &'a Self::Info {
        self.get_info(program).unwrap_or_else(|| {
            panic!(
                "Expected to find info for ID {:?} in program, but none was found.",
                self
            )
        })
    }
    /// Get a mutable reference to the program info, panicking if not found.
    fn expect_info_mut<'a>(&self, program: &'a mut Program<K>) -> &'a mut Self::Info {
        self.get_info_mut(program).unwrap_or_else(|| {
            panic!(
                "Expected to find mutable info for ID {:?} in program, but none was found.",
                self
            )
        })
    }
}

#[macro_export]
macro_rules! identifier {
    ($(#[$attr:meta])* struct $name:ident, $prefix:literal) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub(crate) $crate::Id);

        impl From<$crate::Id> for $name {
            fn from(value: $crate::Id) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $crate::Id {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl $crate::Identifier for $name {}

        impl $name {
            /// Raw arena index of this identifier.
            pub fn raw(self) -> usize {
                self.0.raw()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0.raw())
            }
        }
    };
}
