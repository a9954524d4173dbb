//! Debugger session state: object ids and collection pins.

mod id_map;
mod roots_map;

pub use id_map::{IdMap, ID_BUCKETS};
pub use roots_map::RootsMap;

use mote_core::ObjectId;

use crate::vm::Vm;

/// Id of the synthesized "system" thread group.
pub const SYSTEM_GROUP_ID: u32 = 1;
/// Id of the synthesized "main" thread group.
pub const MAIN_GROUP_ID: u32 = 2;
/// First id handed out for heap objects.
pub const FIRST_OBJECT_ID: u32 = 3;

#[derive(Debug)]
pub struct DebugSession {
    pub ids: IdMap,
    pub pins: RootsMap,
}

impl DebugSession {
    pub fn new() -> Self {
        Self { ids: IdMap::new(FIRST_OBJECT_ID), pins: RootsMap::new() }
    }
}

impl Vm {
    pub fn open_debug_session(&mut self) {
        if self.debug.is_none() {
            log::info!("debugger session opened");
            self.debug = Some(DebugSession::new());
        }
    }

    /// Ends the session, dropping every id and pin.
    pub fn close_debug_session(&mut self) {
        if let Some(session) = self.debug.take() {
            log::info!("debugger session closed: {} ids, {} pins released", session.ids.len(), session.pins.len());
        }
    }

    pub fn debug_session(&self) -> Option<&DebugSession> {
        self.debug.as_ref()
    }

    pub fn debug_session_mut(&mut self) -> Option<&mut DebugSession> {
        self.debug.as_mut()
    }

    /// The debugger id for `obj`, issuing one if needed. 0 without a session.
    pub fn object_id(&mut self, obj: ObjectId) -> u32 {
        self.debug.as_mut().map_or(0, |s| s.ids.put(obj))
    }

    /// The live object behind a debugger id.
    pub fn object_for_id(&self, id: u32) -> Option<ObjectId> {
        let obj = self.debug.as_ref()?.ids.get_by_id(id)?;
        self.heap.contains(obj).then_some(obj)
    }

    /// Keeps the id map in step with the collector.
    pub(crate) fn forget_reclaimed(&mut self, reclaimed: &[ObjectId]) {
        if let Some(session) = self.debug.as_mut() {
            for &obj in reclaimed {
                session.ids.remove_addr(obj);
                session.pins.remove(obj);
            }
        }
    }
}
