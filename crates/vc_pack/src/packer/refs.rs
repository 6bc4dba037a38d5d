use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::any::{Any, type_name};

use hashbrown::HashMap;

use crate::hash::FixedHashState;
use crate::{PackError, PackResult};

/// The ordinal reserved for a shared instance being decoded.
///
/// Obtained in [`Pack::decode_rc`](crate::Pack::decode_rc) and consumed by
/// [`Packer::bind_ref`](crate::Packer::bind_ref).
#[derive(Debug)]
pub struct RefSlot(usize);

impl RefSlot {
    /// The ordinal a back-reference uses for this instance.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Identity tracking of one root call.
///
/// While encoding, allocation addresses map to ordinals assigned in
/// visiting order. While decoding, ordinals map to materialized instances,
/// reserved in the same order before their content is read.
#[derive(Default)]
pub(crate) struct RefTable {
    identities: HashMap<usize, u32, FixedHashState>,
    slots: Vec<Option<Box<dyn Any>>>,
}

impl RefTable {
    /// Returns the ordinal of an already visited address,
    /// or records `addr` with the next ordinal and returns `None`.
    pub(crate) fn visit(&mut self, addr: usize) -> PackResult<Option<u32>> {
        if let Some(&index) = self.identities.get(&addr) {
            return Ok(Some(index));
        }
        let index = u32::try_from(self.identities.len())
            .map_err(|_| PackError::invalid("too many shared instances in one call"))?;
        self.identities.insert(addr, index);
        Ok(None)
    }

    pub(crate) fn reserve(&mut self) -> RefSlot {
        self.slots.push(None);
        RefSlot(self.slots.len() - 1)
    }

    pub(crate) fn bind(&mut self, slot: RefSlot, value: Box<dyn Any>) {
        self.slots[slot.0] = Some(value);
    }

    /// Clones the instance stored at `index` as a `P`.
    pub(crate) fn resolve<P: Clone + 'static>(&self, index: u32) -> PackResult<P> {
        let slot = self.slots.get(index as usize).ok_or_else(|| {
            PackError::invalid(format!("back-reference to unknown instance {index}"))
        })?;
        let Some(value) = slot else {
            return Err(PackError::invalid(format!(
                "back-reference to instance {index} before it can exist"
            )));
        };
        (**value)
            .downcast_ref::<P>()
            .cloned()
            .ok_or_else(|| PackError::TypeMismatch {
                expected: type_name::<P>(),
                found: format!("another shared type at instance {index}").into(),
            })
    }

    pub(crate) fn clear(&mut self) {
        self.identities.clear();
        self.slots.clear();
    }
}
