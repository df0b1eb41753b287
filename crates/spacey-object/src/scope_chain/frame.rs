// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Stack frames.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::object::{ObjectRef, PrivateData};
use crate::value::Value;
use tracing::trace;

/// Identifies a pushed frame. The serial makes ids of popped frames
/// stale even when the stack position is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    index: u32,
    serial: u32,
}

/// One activation: local slots plus the scope objects tied to it.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub(crate) id: FrameId,
    pub(crate) slots: Vec<Value>,
    pub(crate) scope_chain: ObjectRef,
    pub(crate) blocks: Vec<ObjectRef>,
    pub(crate) withs: Vec<ObjectRef>,
}

impl StackFrame {
    /// Frame id.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Local slot values.
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// Innermost scope object.
    pub fn scope_chain(&self) -> ObjectRef {
        self.scope_chain
    }

    /// Every object a frame keeps alive.
    pub(crate) fn objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.slots
            .iter()
            .filter_map(Value::as_object)
            .chain(std::iter::once(self.scope_chain))
            .chain(self.blocks.iter().copied())
            .chain(self.withs.iter().copied())
    }
}

impl Context {
    /// Push a frame with `nslots` undefined locals. The scope chain
    /// defaults to the global object.
    pub fn push_frame(&mut self, nslots: usize, scope_chain: Option<ObjectRef>) -> FrameId {
        self.frame_serial = self.frame_serial.wrapping_add(1);
        let id = FrameId {
            index: self.frames.len() as u32,
            serial: self.frame_serial,
        };
        let scope_chain = scope_chain.unwrap_or_else(|| self.global());
        self.frames.push(StackFrame {
            id,
            slots: vec![Value::Undefined; nslots],
            scope_chain,
            blocks: Vec::new(),
            withs: Vec::new(),
        });
        trace!(frame = ?id, nslots, "pushed frame");
        id
    }

    /// Pop the innermost frame. Block objects still tied to it are
    /// detached first, keeping a copy of their values whether the frame
    /// unwinds normally or not.
    pub fn pop_frame(&mut self, normal: bool) -> Result<()> {
        let (blocks, withs) = match self.frames.last() {
            Some(frame) => (frame.blocks.clone(), frame.withs.clone()),
            None => return Err(Error::internal("no frame to pop")),
        };
        for block in blocks.into_iter().rev() {
            self.put_block_object(block, normal)?;
        }
        for with in withs {
            self.set_private(with, PrivateData::None)?;
        }
        if let Some(frame) = self.frames.pop() {
            trace!(frame = ?frame.id, normal, "popped frame");
        }
        Ok(())
    }

    /// The innermost frame.
    pub fn current_frame(&self) -> Option<FrameId> {
        self.frames.last().map(|f| f.id)
    }

    /// Number of pushed frames.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn frame(&self, id: FrameId) -> Option<&StackFrame> {
        self.frames.get(id.index as usize).filter(|f| f.id == id)
    }

    pub(crate) fn frame_mut(&mut self, id: FrameId) -> Result<&mut StackFrame> {
        self.frames
            .get_mut(id.index as usize)
            .filter(|f| f.id == id)
            .ok_or_else(|| Error::internal("stale frame"))
    }

    /// Read local `slot` of frame `id`.
    pub fn frame_slot(&self, id: FrameId, slot: usize) -> Result<Value> {
        let frame = self.frame(id).ok_or_else(|| Error::internal("stale frame"))?;
        Ok(frame.slots.get(slot).cloned().unwrap_or_default())
    }

    /// Write local `slot` of frame `id`, growing the locals if needed.
    pub fn set_frame_slot(&mut self, id: FrameId, slot: usize, value: Value) -> Result<()> {
        let frame = self.frame_mut(id)?;
        if slot >= frame.slots.len() {
            frame.slots.resize(slot + 1, Value::Undefined);
        }
        frame.slots[slot] = value;
        Ok(())
    }

    /// Innermost scope object of frame `id`.
    pub fn frame_scope_chain(&self, id: FrameId) -> Result<ObjectRef> {
        self.frame(id)
            .map(|f| f.scope_chain)
            .ok_or_else(|| Error::internal("stale frame"))
    }

    /// Enter a lexical block: clone `proto_block` onto the current frame
    /// and make the clone the innermost scope.
    pub fn enter_block(&mut self, proto_block: ObjectRef) -> Result<ObjectRef> {
        let id = self
            .current_frame()
            .ok_or_else(|| Error::internal("block entered without a frame"))?;
        let parent = self.frame_scope_chain(id)?;
        let clone = self.clone_block_object(proto_block, id, parent)?;
        let frame = self.frame_mut(id)?;
        frame.blocks.push(clone);
        frame.scope_chain = clone;
        Ok(clone)
    }

    /// Leave the innermost block of the current frame, detaching it.
    pub fn leave_block(&mut self) -> Result<()> {
        let id = self
            .current_frame()
            .ok_or_else(|| Error::internal("block left without a frame"))?;
        let block = self
            .frame(id)
            .and_then(|f| f.blocks.last().copied())
            .ok_or_else(|| Error::internal("no block to leave"))?;
        let parent = self.get_parent(block)?.unwrap_or_else(|| self.global());
        self.put_block_object(block, true)?;
        self.frame_mut(id)?.scope_chain = parent;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::runtime::Runtime;

    #[test]
    fn test_frame_slots() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let f = cx.push_frame(2, None);
        assert_eq!(cx.frame_scope_chain(f).unwrap(), cx.global());
        cx.set_frame_slot(f, 1, 5.into()).unwrap();
        cx.set_frame_slot(f, 4, 6.into()).unwrap();
        assert_eq!(cx.frame_slot(f, 1).unwrap(), Value::Number(5.0));
        assert_eq!(cx.frame_slot(f, 4).unwrap(), Value::Number(6.0));
        assert_eq!(cx.frame_slot(f, 9).unwrap(), Value::Undefined);
        cx.pop_frame(true).unwrap();
        assert!(cx.frame_slot(f, 1).is_err());
    }

    #[test]
    fn test_reused_position_is_stale() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        let first = cx.push_frame(1, None);
        cx.pop_frame(true).unwrap();
        let second = cx.push_frame(1, None);
        assert_ne!(first, second);
        assert!(cx.frame_slot(first, 0).is_err());
        assert!(cx.frame_slot(second, 0).is_ok());
    }

    #[test]
    fn test_pop_without_frame() {
        let rt = Runtime::new(RuntimeOptions::default());
        let mut cx = rt.new_context();
        assert!(cx.pop_frame(true).is_err());
    }
}
