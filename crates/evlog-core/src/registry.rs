//! Event code registry
//!
//! The registry is built once at startup and is read-only afterwards, so
//! lookups on the hot path need no locking. Ids are dense, which lets the
//! registry (and the enablement filter) index straight into a vector.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::event::{EventCategory, EventCode};

/// Name returned by [`EventCodeRegistry::decode_name`] for unregistered ids
pub const UNKNOWN_EVENT_NAME: &str = "UNKNOWN";

/// Immutable mapping from event code id to [`EventCode`]
#[derive(Debug, Clone)]
pub struct EventCodeRegistry {
    /// Indexed by `id - min_id`
    codes: Vec<EventCode>,
    by_name: HashMap<&'static str, u16>,
    min_id: u16,
}

impl EventCodeRegistry {
    /// Start building a registry
    pub fn builder() -> EventCodeRegistryBuilder {
        EventCodeRegistryBuilder::default()
    }

    /// Build a registry from a static table of codes
    pub fn from_codes(codes: &[EventCode]) -> Result<Self, RegistryError> {
        codes
            .iter()
            .try_fold(Self::builder(), |builder, code| builder.register(*code))?
            .build()
    }

    /// Look up a code by id
    pub fn get(&self, id: u16) -> Option<EventCode> {
        let index = id.checked_sub(self.min_id)? as usize;
        self.codes.get(index).copied()
    }

    /// Look up a code by id, failing for unregistered ids
    pub fn lookup(&self, id: u16) -> Result<EventCode, RegistryError> {
        self.get(id).ok_or(RegistryError::UnknownId(id))
    }

    /// Look up a code by the id carried in a frame header
    pub fn get_by_type_id(&self, type_id: i32) -> Option<EventCode> {
        u16::try_from(type_id).ok().and_then(|id| self.get(id))
    }

    /// Look up a code by its symbolic name
    pub fn by_name(&self, name: &str) -> Option<EventCode> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Symbolic name for an id, or [`UNKNOWN_EVENT_NAME`]
    pub fn decode_name(&self, id: u16) -> &'static str {
        self.get(id).map_or(UNKNOWN_EVENT_NAME, |code| code.name)
    }

    /// All codes belonging to a category
    pub fn codes_in(&self, category: EventCategory) -> impl Iterator<Item = EventCode> + '_ {
        self.codes
            .iter()
            .copied()
            .filter(move |code| code.category == category)
    }

    /// Iterate codes in id order
    pub fn iter(&self) -> impl Iterator<Item = EventCode> + '_ {
        self.codes.iter().copied()
    }

    /// Number of registered codes
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Lowest registered id
    pub fn min_id(&self) -> u16 {
        self.min_id
    }

    /// Highest registered id
    pub fn max_id(&self) -> u16 {
        match self.codes.last() {
            Some(code) => code.id,
            None => self.min_id,
        }
    }
}

/// Builder for [`EventCodeRegistry`]
#[derive(Debug, Default)]
pub struct EventCodeRegistryBuilder {
    codes: Vec<EventCode>,
}

impl EventCodeRegistryBuilder {
    /// Register a code
    ///
    /// Fails on id 0, a duplicate id or a duplicate name.
    pub fn register(mut self, code: EventCode) -> Result<Self, RegistryError> {
        if code.id == 0 {
            return Err(RegistryError::ReservedId(code.name));
        }
        if let Some(existing) = self.codes.iter().find(|c| c.id == code.id) {
            return Err(RegistryError::DuplicateId {
                id: code.id,
                existing: existing.name,
                duplicate: code.name,
            });
        }
        if self.codes.iter().any(|c| c.name == code.name) {
            return Err(RegistryError::DuplicateName(code.name));
        }
        self.codes.push(code);
        Ok(self)
    }

    /// Finish the registry, checking that ids form a gap-free range
    pub fn build(mut self) -> Result<EventCodeRegistry, RegistryError> {
        self.codes.sort_by_key(|code| code.id);

        let min_id = self.codes.first().map_or(1, |code| code.id);
        for (offset, code) in self.codes.iter().enumerate() {
            let expected = min_id + offset as u16;
            if code.id != expected {
                return Err(RegistryError::NotDense { missing: expected });
            }
        }

        let by_name = self.codes.iter().map(|code| (code.name, code.id)).collect();

        Ok(EventCodeRegistry {
            codes: self.codes,
            by_name,
            min_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PayloadKind;

    const A: EventCode = EventCode::new(
        1,
        "A",
        EventCategory::ControlSession,
        PayloadKind::Raw,
    );
    const B: EventCode = EventCode::new(2, "B", EventCategory::Lifecycle, PayloadKind::Raw);
    const C: EventCode = EventCode::new(
        3,
        "C",
        EventCategory::ControlSession,
        PayloadKind::Raw,
    );

    #[test]
    fn test_build_and_lookup() {
        let registry = EventCodeRegistry::from_codes(&[C, A, B]).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.min_id(), 1);
        assert_eq!(registry.max_id(), 3);
        assert_eq!(registry.get(2), Some(B));
        assert_eq!(registry.lookup(3).unwrap(), C);
        assert_eq!(registry.by_name("A"), Some(A));
        assert_eq!(registry.get_by_type_id(1), Some(A));
        assert_eq!(registry.get_by_type_id(-1), None);
    }

    #[test]
    fn test_decode_name() {
        let registry = EventCodeRegistry::from_codes(&[A, B]).unwrap();
        assert_eq!(registry.decode_name(2), "B");
        assert_eq!(registry.decode_name(0), UNKNOWN_EVENT_NAME);
        assert_eq!(registry.decode_name(99), UNKNOWN_EVENT_NAME);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let dup = EventCode::new(1, "A2", EventCategory::Lifecycle, PayloadKind::Raw);
        let err = EventCodeRegistry::from_codes(&[A, dup]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateId {
                id: 1,
                existing: "A",
                duplicate: "A2"
            }
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let dup = EventCode::new(2, "A", EventCategory::Lifecycle, PayloadKind::Raw);
        let err = EventCodeRegistry::from_codes(&[A, dup]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("A"));
    }

    #[test]
    fn test_reserved_id_rejected() {
        let zero = EventCode::new(0, "ZERO", EventCategory::Lifecycle, PayloadKind::Raw);
        assert_eq!(
            EventCodeRegistry::from_codes(&[zero]).unwrap_err(),
            RegistryError::ReservedId("ZERO")
        );
    }

    #[test]
    fn test_gap_rejected() {
        let err = EventCodeRegistry::from_codes(&[A, C]).unwrap_err();
        assert_eq!(err, RegistryError::NotDense { missing: 2 });
    }

    #[test]
    fn test_codes_in_category() {
        let registry = EventCodeRegistry::from_codes(&[A, B, C]).unwrap();
        let control: Vec<_> = registry
            .codes_in(EventCategory::ControlSession)
            .map(|c| c.id)
            .collect();
        assert_eq!(control, vec![1, 3]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = EventCodeRegistry::builder().build().unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.get(1), None);
    }
}
