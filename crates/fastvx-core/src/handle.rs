//! Typed handles and the generational slot registry behind them.
//!
//! A handle is a slot index plus the generation the slot had when the object
//! was created. Releasing an object bumps the slot's generation, so any copy
//! of the old handle is rejected with [`Status::InvalidReference`] instead of
//! aliasing whatever reuses the slot.

use core::fmt;

use crate::error::{Error, Result, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Slot {
    index: u32,
    generation: u32,
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) Slot);

        impl From<$name> for Reference {
            fn from(h: $name) -> Self {
                Reference::$variant(h)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " #{}.{}"), self.0.index, self.0.generation)
            }
        }
    };
}

handle!(
    /// Handle to an image or a region-of-interest view of one.
    ImageHandle,
    Image,
    "image"
);
handle!(ScalarHandle, Scalar, "scalar");
handle!(ArrayHandle, Array, "array");

/// Any engine-owned object, used for status queries and release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Image(ImageHandle),
    Scalar(ScalarHandle),
    Array(ArrayHandle),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(h) => fmt::Display::fmt(h, f),
            Self::Scalar(h) => fmt::Display::fmt(h, f),
            Self::Array(h) => fmt::Display::fmt(h, f),
        }
    }
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with generation checks and slot reuse.
pub(crate) struct Registry<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Registry<T> {
    pub(crate) fn insert(&mut self, value: T) -> Result<Slot> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.entries.len()).map_err(|_| {
                    Error::new(Status::NoResources, "registry slot index exhausted")
                })?;
                self.entries
                    .try_reserve(1)
                    .map_err(|_| Error::new(Status::NoMemory, "growing registry"))?;
                self.entries.push(Entry {
                    generation: 0,
                    value: None,
                });
                index
            }
        };

        let entry = &mut self.entries[index as usize];
        entry.value = Some(value);
        self.live += 1;
        Ok(Slot {
            index,
            generation: entry.generation,
        })
    }

    pub(crate) fn get(&self, slot: Slot) -> Result<&T> {
        self.entries
            .get(slot.index as usize)
            .filter(|e| e.generation == slot.generation)
            .and_then(|e| e.value.as_ref())
            .ok_or_else(|| stale(slot))
    }

    pub(crate) fn get_mut(&mut self, slot: Slot) -> Result<&mut T> {
        self.entries
            .get_mut(slot.index as usize)
            .filter(|e| e.generation == slot.generation)
            .and_then(|e| e.value.as_mut())
            .ok_or_else(|| stale(slot))
    }

    pub(crate) fn contains(&self, slot: Slot) -> bool {
        self.get(slot).is_ok()
    }

    pub(crate) fn remove(&mut self, slot: Slot) -> Result<T> {
        let entry = self
            .entries
            .get_mut(slot.index as usize)
            .filter(|e| e.generation == slot.generation)
            .ok_or_else(|| stale(slot))?;
        let value = entry.value.take().ok_or_else(|| stale(slot))?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot.index);
        self.live -= 1;
        Ok(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

fn stale(slot: Slot) -> Error {
    Error::new(
        Status::InvalidReference,
        format!(
            "slot {} generation {} is not live",
            slot.index, slot.generation
        ),
    )
}
