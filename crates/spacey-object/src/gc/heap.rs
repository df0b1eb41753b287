// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Object heap.
//!
//! Objects live in a vector of cells addressed by [`ObjectRef`]. Freed
//! cells go on a free list and are reused under a bumped generation, so a
//! handle outliving its object fails to resolve instead of aliasing the
//! cell's next occupant.

use crate::error::{Error, Result};
use crate::object::{JsObject, ObjectRef};

/// Per-cell collector metadata.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CellHeader {
    pub(crate) generation: u32,
    pub(crate) marked: bool,
}

/// A heap cell: header plus the object, if live.
pub(crate) struct Cell {
    pub(crate) header: CellHeader,
    pub(crate) object: Option<JsObject>,
}

/// Object storage for one context.
#[derive(Default)]
pub struct Heap {
    cells: Vec<Cell>,
    free: Vec<u32>,
    live: usize,
    allocated: u64,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `object` and returns its handle.
    pub fn allocate(&mut self, object: JsObject) -> ObjectRef {
        self.live += 1;
        self.allocated += 1;
        if let Some(index) = self.free.pop() {
            let cell = &mut self.cells[index as usize];
            cell.header.marked = false;
            cell.object = Some(object);
            return ObjectRef {
                index,
                generation: cell.header.generation,
            };
        }
        let index = self.cells.len() as u32;
        self.cells.push(Cell {
            header: CellHeader::default(),
            object: Some(object),
        });
        ObjectRef {
            index,
            generation: 0,
        }
    }

    /// True if `r` names a live object.
    pub fn contains(&self, r: ObjectRef) -> bool {
        self.cell(r).is_some()
    }

    /// Resolves a handle.
    pub fn get(&self, r: ObjectRef) -> Result<&JsObject> {
        self.cell(r)
            .and_then(|c| c.object.as_ref())
            .ok_or_else(|| dangling(r))
    }

    /// Resolves a handle mutably.
    pub fn get_mut(&mut self, r: ObjectRef) -> Result<&mut JsObject> {
        match self.cells.get_mut(r.index as usize) {
            Some(cell) if cell.header.generation == r.generation => {
                cell.object.as_mut().ok_or_else(|| dangling(r))
            }
            _ => Err(dangling(r)),
        }
    }

    /// Frees the object behind `r`, returning it.
    pub(crate) fn free(&mut self, r: ObjectRef) -> Option<JsObject> {
        let cell = self.cells.get_mut(r.index as usize)?;
        if cell.header.generation != r.generation {
            return None;
        }
        let object = cell.object.take()?;
        cell.header.generation = cell.header.generation.wrapping_add(1);
        cell.header.marked = false;
        self.free.push(r.index);
        self.live -= 1;
        Some(object)
    }

    /// Sets the mark bit. Returns true if the object was live and
    /// previously unmarked.
    pub(crate) fn mark(&mut self, r: ObjectRef) -> bool {
        match self.cells.get_mut(r.index as usize) {
            Some(cell)
                if cell.header.generation == r.generation
                    && cell.object.is_some()
                    && !cell.header.marked =>
            {
                cell.header.marked = true;
                true
            }
            _ => false,
        }
    }

    /// True if the object is marked.
    pub(crate) fn is_marked(&self, r: ObjectRef) -> bool {
        self.cell(r).is_some_and(|c| c.header.marked)
    }

    /// Clears every mark bit.
    pub(crate) fn clear_marks(&mut self) {
        for cell in &mut self.cells {
            cell.header.marked = false;
        }
    }

    /// Handles of every live object.
    pub fn handles(&self) -> Vec<ObjectRef> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.object.is_some())
            .map(|(i, c)| ObjectRef {
                index: i as u32,
                generation: c.header.generation,
            })
            .collect()
    }

    /// Handles of live, unmarked objects.
    pub(crate) fn unmarked(&self) -> Vec<ObjectRef> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.object.is_some() && !c.header.marked)
            .map(|(i, c)| ObjectRef {
                index: i as u32,
                generation: c.header.generation,
            })
            .collect()
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Number of live objects.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Objects allocated over the heap's lifetime.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Number of cells, live or free.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn cell(&self, r: ObjectRef) -> Option<&Cell> {
        self.cells
            .get(r.index as usize)
            .filter(|c| c.header.generation == r.generation && c.object.is_some())
    }
}

fn dangling(r: ObjectRef) -> Error {
    Error::internal(format!("dangling object reference {:?}", r))
}
