// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-object slot storage.
//!
//! Every object carries [`INITIAL_NSLOTS`] inline slots. Objects that need
//! more get a dynamic array sized by [`SlotGrowth`]; its length counts the
//! hidden capacity word of the classic layout, so the usable slot count is
//! `INITIAL_NSLOTS + words - 1`.
//!
//! Slots past the owning scope's `freeslot` always hold `undefined`.

use crate::config::SlotGrowth;
use crate::error::Result;
use crate::value::Value;
use tracing::trace;

/// Number of inline slots.
pub const INITIAL_NSLOTS: usize = 3;

static UNDEFINED: Value = Value::Undefined;

/// Inline plus dynamic value storage for one object.
#[derive(Debug, Clone)]
pub struct Slots {
    fixed: [Value; INITIAL_NSLOTS],
    dynamic: Vec<Value>,
    reallocs: u32,
}

impl Default for Slots {
    fn default() -> Self {
        Self::new()
    }
}

impl Slots {
    /// Storage with only the inline slots.
    pub fn new() -> Self {
        Self {
            fixed: Default::default(),
            dynamic: Vec::new(),
            reallocs: 0,
        }
    }

    /// Storage sized exactly for `nslots` slots.
    pub fn with_slots(nslots: usize) -> Self {
        let mut slots = Self::new();
        if nslots > INITIAL_NSLOTS {
            slots.dynamic = vec![Value::Undefined; nslots - INITIAL_NSLOTS];
        }
        slots
    }

    /// Number of usable slots.
    pub fn num_slots(&self) -> usize {
        INITIAL_NSLOTS + self.dynamic.len()
    }

    /// True once a dynamic array has been allocated.
    pub fn has_dynamic(&self) -> bool {
        !self.dynamic.is_empty()
    }

    /// Number of times the dynamic array was (re)allocated.
    pub fn reallocations(&self) -> u32 {
        self.reallocs
    }

    /// Read a slot. Out-of-range reads see `undefined`.
    pub fn get(&self, slot: usize) -> &Value {
        debug_assert!(slot < self.num_slots(), "slot {} out of range", slot);
        if slot < INITIAL_NSLOTS {
            &self.fixed[slot]
        } else {
            self.dynamic.get(slot - INITIAL_NSLOTS).unwrap_or(&UNDEFINED)
        }
    }

    /// Write a slot. Returns false if the slot does not exist.
    pub fn set(&mut self, slot: usize, value: Value) -> bool {
        debug_assert!(slot < self.num_slots(), "slot {} out of range", slot);
        if slot < INITIAL_NSLOTS {
            self.fixed[slot] = value;
            true
        } else if let Some(v) = self.dynamic.get_mut(slot - INITIAL_NSLOTS) {
            *v = value;
            true
        } else {
            false
        }
    }

    /// Iterate over the first `n` slots.
    pub fn iter(&self, n: usize) -> impl Iterator<Item = &Value> {
        self.fixed
            .iter()
            .chain(self.dynamic.iter())
            .take(n.min(self.num_slots()))
    }

    /// Allocate exactly enough storage for `nslots` slots on a fresh object.
    pub fn alloc_slots(&mut self, nslots: usize) -> Result<()> {
        debug_assert!(!self.has_dynamic());
        if nslots <= INITIAL_NSLOTS {
            return Ok(());
        }
        let len = dynamic_words(nslots) - 1;
        self.dynamic.try_reserve_exact(len)?;
        self.dynamic.resize(len, Value::Undefined);
        self.reallocs += 1;
        Ok(())
    }

    /// Grow to hold at least `nslots` slots, rounding per `growth`.
    pub fn grow_slots(&mut self, nslots: usize, growth: &SlotGrowth) -> Result<()> {
        if nslots <= self.num_slots() {
            return Ok(());
        }
        let len = growth.round_words(dynamic_words(nslots)) - 1;
        let additional = len - self.dynamic.len();
        self.dynamic.try_reserve_exact(additional)?;
        self.dynamic.resize(len, Value::Undefined);
        self.reallocs += 1;
        trace!(nslots = self.num_slots(), "grew dynamic slots");
        Ok(())
    }

    /// Shrink to `nslots` slots, freeing the dynamic array when the inline
    /// slots suffice. Slots at or past `nslots` must already be undefined.
    pub fn shrink_slots(&mut self, nslots: usize) {
        if !self.has_dynamic() || nslots >= self.num_slots() {
            return;
        }
        if nslots <= INITIAL_NSLOTS {
            self.dynamic = Vec::new();
        } else {
            self.dynamic.truncate(dynamic_words(nslots) - 1);
            self.dynamic.shrink_to_fit();
        }
    }

    /// Reset slots `from..` to undefined.
    pub fn clear_from(&mut self, from: usize) {
        for slot in from..self.num_slots() {
            self.set(slot, Value::Undefined);
        }
    }
}

/// Dynamic words needed for `nslots`, counting the capacity word.
fn dynamic_words(nslots: usize) -> usize {
    nslots + 1 - INITIAL_NSLOTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_slots_need_no_allocation() {
        let mut slots = Slots::new();
        slots.alloc_slots(2).unwrap();
        assert_eq!(slots.num_slots(), INITIAL_NSLOTS);
        assert!(!slots.has_dynamic());
        assert_eq!(slots.reallocations(), 0);
    }

    #[test]
    fn test_grow_rounds_to_minimum_block() {
        let mut slots = Slots::new();
        slots.grow_slots(4, &SlotGrowth::default()).unwrap();
        // 4 slots need 2 words; rounded to 4 words, 3 usable
        assert_eq!(slots.num_slots(), 6);
        assert!(slots.iter(6).all(Value::is_undefined));
    }

    #[test]
    fn test_grow_then_shrink() {
        let growth = SlotGrowth::default();
        let mut slots = Slots::new();
        slots.grow_slots(40, &growth).unwrap();
        assert_eq!(slots.num_slots(), INITIAL_NSLOTS + 63);
        slots.set(39, Value::Number(1.0));
        slots.shrink_slots(41);
        assert_eq!(slots.num_slots(), 41);
        assert_eq!(slots.get(39), &Value::Number(1.0));
        slots.shrink_slots(2);
        assert!(!slots.has_dynamic());
    }

    #[test]
    fn test_reallocations_are_logarithmic_then_linear() {
        let growth = SlotGrowth::default();
        let mut slots = Slots::new();
        for n in 1..=1_000_000usize {
            slots.grow_slots(n, &growth).unwrap();
        }
        assert!(slots.num_slots() >= 1_000_000);
        // 14 doublings to the linear threshold, then one per 65536-word block
        assert!(slots.reallocations() < 40, "{}", slots.reallocations());
    }
}
