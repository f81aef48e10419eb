//! Enablement filter
//!
//! Decides on the producer hot path whether an event code is captured at
//! all. Built once from the enabled-events expression and never mutated
//! afterwards.
//!
//! Accepted expression forms, comma separated:
//! - `all`: every registered code
//! - `CMD_IN_KEEP_ALIVE`: a code name
//! - `28`: a numeric code id
//! - `control-session`, `lifecycle`: every code in a category

use crate::error::ConfigError;
use crate::event::EventCategory;
use crate::registry::EventCodeRegistry;

/// Token that enables every registered code
pub const ALL_TOKEN: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
enum EnabledSet {
    All,
    /// One bit per id, indexed by the id itself
    Codes(Box<[u64]>),
}

/// Set of enabled event codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnablementFilter {
    set: EnabledSet,
    categories: u8,
    enabled_count: usize,
}

impl EnablementFilter {
    /// Filter enabling every code of every category
    pub fn all() -> Self {
        Self {
            set: EnabledSet::All,
            categories: EventCategory::ALL.iter().fold(0, |acc, c| acc | c.bit()),
            enabled_count: usize::MAX,
        }
    }

    /// Filter enabling nothing
    pub fn none() -> Self {
        Self {
            set: EnabledSet::Codes(Vec::new().into_boxed_slice()),
            categories: 0,
            enabled_count: 0,
        }
    }

    /// Parse an enabled-events expression against a registry
    ///
    /// A blank expression enables nothing. Any token that does not resolve to
    /// a registered code or a known category fails the whole expression.
    pub fn parse(expression: &str, registry: &EventCodeRegistry) -> Result<Self, ConfigError> {
        if expression.trim().is_empty() {
            return Ok(Self::none());
        }

        let words = (registry.max_id() as usize / 64) + 1;
        let mut bits = vec![0u64; words].into_boxed_slice();
        let mut all = false;

        for (position, raw) in expression.split(',').enumerate() {
            let token = raw.trim();
            if token.is_empty() {
                return Err(ConfigError::EmptyToken {
                    expression: expression.to_string(),
                    position,
                });
            }

            if token.eq_ignore_ascii_case(ALL_TOKEN) {
                all = true;
            } else if token.bytes().all(|b| b.is_ascii_digit()) {
                let code = token
                    .parse::<u16>()
                    .ok()
                    .and_then(|id| registry.get(id))
                    .ok_or_else(|| ConfigError::UnknownEventId(token.to_string()))?;
                set_bit(&mut bits, code.id);
            } else if let Some(code) = registry.by_name(token) {
                set_bit(&mut bits, code.id);
            } else if let Ok(category) = token.parse::<EventCategory>() {
                for code in registry.codes_in(category) {
                    set_bit(&mut bits, code.id);
                }
            } else {
                return Err(ConfigError::UnknownEventName(token.to_string()));
            }
        }

        if all {
            return Ok(Self::all());
        }

        let mut categories = 0u8;
        let mut enabled_count = 0;
        for code in registry.iter() {
            if is_bit_set(&bits, code.id) {
                categories |= code.category.bit();
                enabled_count += 1;
            }
        }

        Ok(Self {
            set: EnabledSet::Codes(bits),
            categories,
            enabled_count,
        })
    }

    /// Whether frames for this code id should be written
    #[inline]
    pub fn is_enabled(&self, id: u16) -> bool {
        match &self.set {
            EnabledSet::All => true,
            EnabledSet::Codes(bits) => is_bit_set(bits, id),
        }
    }

    /// Whether at least one code of the category is enabled
    #[inline]
    pub fn is_enabled_for_category(&self, category: EventCategory) -> bool {
        self.categories & category.bit() != 0
    }

    /// Whether this filter was built from the `all` token
    pub fn is_all(&self) -> bool {
        matches!(self.set, EnabledSet::All)
    }

    /// Number of enabled codes (`usize::MAX` for `all`)
    pub fn enabled_count(&self) -> usize {
        self.enabled_count
    }
}

fn set_bit(bits: &mut [u64], id: u16) {
    bits[id as usize / 64] |= 1u64 << (id % 64);
}

#[inline]
fn is_bit_set(bits: &[u64], id: u16) -> bool {
    bits.get(id as usize / 64)
        .is_some_and(|word| *word & (1u64 << (id % 64)) != 0)
}
