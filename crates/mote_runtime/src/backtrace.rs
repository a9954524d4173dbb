//! Interpreter stack seam and backtrace capture.

use std::rc::Rc;

use mote_core::{BuildFlags, Cell, ObjectId};
use smallvec::SmallVec;

use crate::exception::VmResult;
use crate::heap::{AllocType, BlockBody};
use crate::vm::Vm;

pub const LINE_UNKNOWN: i32 = -1;
pub const LINE_NATIVE: i32 = -2;

/// One captured frame. Names point into the UTF pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub class_name: ObjectId,
    pub method_name: ObjectId,
    pub source_file: Option<ObjectId>,
    pub line: i32,
}

#[derive(Debug, Clone, Default)]
pub struct Backtrace {
    pub frames: SmallVec<[FrameRecord; 8]>,
}

impl Backtrace {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub start_pc: u32,
    pub line: u16,
}

/// What the interpreter knows about a method that shows up in a frame.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub class_name: ObjectId,
    pub method_name: ObjectId,
    pub source_file: Option<ObjectId>,
    /// Present when the class file carried line number data.
    pub line_table: Option<Vec<LineEntry>>,
    pub native: bool,
}

impl MethodInfo {
    pub fn line_for_pc(&self, pc: u32) -> i32 {
        if self.native {
            return LINE_NATIVE;
        }
        let Some(table) = &self.line_table else {
            return LINE_UNKNOWN;
        };
        table
            .iter()
            .filter(|entry| entry.start_pc <= pc)
            .max_by_key(|entry| entry.start_pc)
            .map_or(LINE_UNKNOWN, |entry| entry.line as i32)
    }
}

/// The interpreter's frame chain as seen by the core.
pub trait ExecutionStack {
    /// Hands every live cell (locals and operands) to `visit`.
    fn visit_roots(&self, visit: &mut dyn FnMut(Cell));

    /// Walks frames innermost first with their current pc. Returning
    /// `false` from `visit` stops the walk.
    fn walk_frames(&self, visit: &mut dyn FnMut(&MethodInfo, u32) -> bool);
}

/// Stack of a VM with no interpreter attached.
pub struct EmptyStack;

impl ExecutionStack for EmptyStack {
    fn visit_roots(&self, _visit: &mut dyn FnMut(Cell)) {}

    fn walk_frames(&self, _visit: &mut dyn FnMut(&MethodInfo, u32) -> bool) {}
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub method: Rc<MethodInfo>,
    pub pc: u32,
    pub locals: Vec<Cell>,
    pub operands: Vec<Cell>,
}

#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, method: Rc<MethodInfo>, locals: Vec<Cell>) -> &mut Frame {
        self.frames.push(Frame { method, pc: 0, locals, operands: Vec::new() });
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl ExecutionStack for FrameStack {
    fn visit_roots(&self, visit: &mut dyn FnMut(Cell)) {
        for frame in &self.frames {
            frame.locals.iter().chain(frame.operands.iter()).for_each(|c| visit(*c));
        }
    }

    fn walk_frames(&self, visit: &mut dyn FnMut(&MethodInfo, u32) -> bool) {
        for frame in self.frames.iter().rev() {
            if !visit(&frame.method, frame.pc) {
                break;
            }
        }
    }
}

impl Vm {
    /// Builds a `MethodInfo` with its names pooled.
    pub fn method_info(
        &mut self,
        class_name: &str,
        method_name: &str,
        source_file: Option<&str>,
        line_table: Option<Vec<LineEntry>>,
        native: bool,
    ) -> VmResult<MethodInfo> {
        let class_name = self.utf_str(class_name)?;
        let method_name = self.utf_str(method_name)?;
        let source_file = source_file.map(|s| self.utf_str(s)).transpose()?;
        Ok(MethodInfo { class_name, method_name, source_file, line_table, native })
    }

    /// Snapshots the current frame chain, bounded by the configured depth.
    pub fn snapshot_frames(&self) -> Backtrace {
        let limit = self.config.backtrace_depth;
        let line_numbers = BuildFlags::CURRENT.line_numbers;
        let mut backtrace = Backtrace::default();
        self.stack.walk_frames(&mut |method, pc| {
            if backtrace.frames.len() >= limit {
                return false;
            }
            let has_lines = line_numbers && method.line_table.is_some();
            let line = if method.native {
                LINE_NATIVE
            } else if has_lines {
                method.line_for_pc(pc)
            } else {
                LINE_UNKNOWN
            };
            backtrace.frames.push(FrameRecord {
                class_name: method.class_name,
                method_name: method.method_name,
                source_file: if has_lines { method.source_file } else { None },
                line,
            });
            true
        });
        backtrace
    }

    /// Captures the current frames into a data block, or `None` when stack
    /// traces are compiled out.
    pub fn capture_backtrace(&mut self) -> VmResult<Option<ObjectId>> {
        if !BuildFlags::CURRENT.stacktrace {
            return Ok(None);
        }
        let backtrace = self.snapshot_frames();
        let id = self.alloc(AllocType::Data, BlockBody::Backtrace(backtrace))?;
        Ok(Some(id))
    }

    pub fn backtrace(&self, block: ObjectId) -> Option<&Backtrace> {
        match self.heap.body(block)? {
            BlockBody::Backtrace(b) => Some(b),
            _ => None,
        }
    }

    /// `Class.method(File.java:12)` style rendering of one frame.
    pub fn format_frame(&self, frame: &FrameRecord) -> String {
        let utf = |id: ObjectId| {
            self.utf_bytes(id)
                .map(|b| String::from_utf8_lossy(b).replace('/', "."))
                .unwrap_or_default()
        };
        let location = match (frame.line, frame.source_file) {
            (LINE_NATIVE, _) => "Native Method".to_string(),
            (line, Some(file)) if line >= 0 => format!("{}:{}", utf(file), line),
            (_, Some(file)) => utf(file),
            (_, None) => "Unknown Source".to_string(),
        };
        format!("{}.{}({})", utf(frame.class_name), utf(frame.method_name), location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup_picks_closest_preceding_entry() {
        let method = MethodInfo {
            class_name: ObjectId(0),
            method_name: ObjectId(0),
            source_file: None,
            line_table: Some(vec![
                LineEntry { start_pc: 0, line: 10 },
                LineEntry { start_pc: 5, line: 11 },
                LineEntry { start_pc: 9, line: 14 },
            ]),
            native: false,
        };
        assert_eq!(method.line_for_pc(0), 10);
        assert_eq!(method.line_for_pc(7), 11);
        assert_eq!(method.line_for_pc(100), 14);
    }

    #[test]
    fn native_and_unknown_lines() {
        let mut method = MethodInfo {
            class_name: ObjectId(0),
            method_name: ObjectId(0),
            source_file: None,
            line_table: None,
            native: false,
        };
        assert_eq!(method.line_for_pc(3), LINE_UNKNOWN);
        method.native = true;
        assert_eq!(method.line_for_pc(3), LINE_NATIVE);
    }
}
