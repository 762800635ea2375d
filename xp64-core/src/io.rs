//! Registry of the $DE00-$DFFF I/O window claims.
//!
//! At most one device may own any given address in the two expansion I/O
//! pages. Claims are checked at registration time; overlap is a reportable
//! error so the caller can detach the conflicting device and retry, it is
//! never resolved silently.

use thiserror::Error;

/// Which priority tier owns a claim. Dispatch uses this to route an I/O
/// access back to the right cartridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOwner {
    Slot0,
    Slot1,
    MainSlot,
}

/// One registered I/O window.
#[derive(Debug, Clone)]
pub struct IoSource {
    /// Literal device name, used in conflict reports and the monitor.
    pub name: &'static str,
    pub start: u16,
    pub end: u16,
    /// Documented register-mirroring mask. Handlers apply their own
    /// masking; the registry only records it for the monitor.
    pub address_mask: u8,
    pub owner: IoOwner,
}

impl IoSource {
    pub fn contains(&self, addr: u16) -> bool {
        (self.start..=self.end).contains(&addr)
    }

    fn overlaps(&self, other: &IoSource) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Returned by [`IoRegistry::register`]; passed back to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoHandle(u32);

#[derive(Debug, Clone, Error)]
#[error(
    "I/O range ${start:04X}-${end:04X} claimed by {device} overlaps \
     ${existing_start:04X}-${existing_end:04X} claimed by {existing}"
)]
pub struct IoConflict {
    pub device: &'static str,
    pub start: u16,
    pub end: u16,
    pub existing: &'static str,
    pub existing_start: u16,
    pub existing_end: u16,
}

/// Append-only list of claims with O(n) removal by handle.
#[derive(Debug, Default)]
pub struct IoRegistry {
    entries: Vec<(IoHandle, IoSource)>,
    next_handle: u32,
}

impl IoRegistry {
    /// Claim an address range. Fails without side effects if any already
    /// registered claim overlaps it.
    pub fn register(&mut self, source: IoSource) -> Result<IoHandle, IoConflict> {
        if let Some((_, existing)) = self
            .entries
            .iter()
            .find(|(_, existing)| existing.overlaps(&source))
        {
            return Err(IoConflict {
                device: source.name,
                start: source.start,
                end: source.end,
                existing: existing.name,
                existing_start: existing.start,
                existing_end: existing.end,
            });
        }

        let handle = IoHandle(self.next_handle);
        self.next_handle += 1;
        log::debug!(
            "I/O claim ${:04X}-${:04X} registered for {}",
            source.start,
            source.end,
            source.name
        );
        self.entries.push((handle, source));
        Ok(handle)
    }

    /// Remove a claim. Unknown handles are ignored so detach paths can be
    /// called twice without harm.
    pub fn unregister(&mut self, handle: IoHandle) {
        self.entries.retain(|(h, _)| *h != handle);
    }

    /// Remove every claim held by the given owner tier.
    pub fn unregister_owner(&mut self, owner: IoOwner) {
        self.entries.retain(|(_, source)| source.owner != owner);
    }

    /// The device that answers at `addr`, if any.
    pub fn device_at(&self, addr: u16) -> Option<&IoSource> {
        self.entries
            .iter()
            .map(|(_, source)| source)
            .find(|source| source.contains(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(name: &'static str, start: u16, end: u16) -> IoSource {
        IoSource {
            name,
            start,
            end,
            address_mask: 0xFF,
            owner: IoOwner::MainSlot,
        }
    }

    #[test]
    fn disjoint_pages_coexist() {
        let mut registry = IoRegistry::default();
        registry.register(claim("io1 dev", 0xDE00, 0xDEFF)).unwrap();
        registry.register(claim("io2 dev", 0xDF00, 0xDFFF)).unwrap();

        assert_eq!("io1 dev", registry.device_at(0xDE80).unwrap().name);
        assert_eq!("io2 dev", registry.device_at(0xDF00).unwrap().name);
    }

    #[test]
    fn overlap_is_rejected_and_reported() {
        let mut registry = IoRegistry::default();
        registry.register(claim("first", 0xDE00, 0xDEFF)).unwrap();

        let err = registry
            .register(claim("second", 0xDE80, 0xDF10))
            .unwrap_err();
        assert_eq!("second", err.device);
        assert_eq!("first", err.existing);

        // The failed registration must not have been recorded.
        assert!(registry.device_at(0xDF10).is_none());
    }

    #[test]
    fn unregister_frees_the_range() {
        let mut registry = IoRegistry::default();
        let handle = registry.register(claim("dev", 0xDF00, 0xDFFF)).unwrap();

        registry.unregister(handle);
        registry.unregister(handle); // second call is a no-op

        assert!(registry.device_at(0xDF42).is_none());
        registry.register(claim("other", 0xDF00, 0xDFFF)).unwrap();
    }

    #[test]
    fn sub_page_claims_conflict_only_when_overlapping() {
        let mut registry = IoRegistry::default();
        registry.register(claim("low", 0xDF00, 0xDF7F)).unwrap();
        registry.register(claim("high", 0xDF80, 0xDFFF)).unwrap();

        assert!(registry.register(claim("mid", 0xDF40, 0xDFC0)).is_err());
    }
}
