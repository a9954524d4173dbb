//! File capability.
//!
//! Positions and sizes are 32-bit, matching what the class library above
//! the VM exposes. Handles come from a fixed-size table; running out of
//! slots is reported as `FsError::HandlesExhausted`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use thiserror::Error;

pub const MAX_OPEN_FILES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Set,
    Current,
    End,
}

#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file: {0}")]
    NotFound(String),
    #[error("bad file handle {0}")]
    BadHandle(usize),
    #[error("too many open files")]
    HandlesExhausted,
    #[error("seek out of range")]
    InvalidSeek,
    #[error("file too large for 32-bit positions")]
    TooLarge,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait FileSystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError>;
    fn close(&mut self, handle: FileHandle) -> Result<(), FsError>;
    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, FsError>;
    fn write(&mut self, handle: FileHandle, buf: &[u8]) -> Result<usize, FsError>;
    fn flush(&mut self, handle: FileHandle) -> Result<(), FsError>;
    fn set_pos(&mut self, handle: FileHandle, offset: i32, origin: SeekOrigin)
        -> Result<(), FsError>;
    fn get_pos(&mut self, handle: FileHandle) -> Result<i32, FsError>;
    fn size(&mut self, handle: FileHandle) -> Result<i32, FsError>;
    fn truncate(&mut self, handle: FileHandle, len: i32) -> Result<(), FsError>;
    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError>;
    fn remove(&mut self, path: &str) -> Result<(), FsError>;
    fn exists(&self, path: &str) -> bool;

    /// Reads the whole file; a convenience over open/size/read/close.
    fn read_all(&mut self, path: &str) -> Result<Vec<u8>, FsError> {
        let handle = self.open(path, OpenMode::Read)?;
        let result = (|| -> Result<Vec<u8>, FsError> {
            let len = self.size(handle)? as usize;
            let mut buf = vec![0u8; len];
            let mut filled = 0;
            while filled < len {
                let n = self.read(handle, &mut buf[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            buf.truncate(filled);
            Ok(buf)
        })();
        self.close(handle)?;
        result
    }
}

fn free_slot<T>(table: &mut Vec<Option<T>>) -> Result<usize, FsError> {
    if let Some(idx) = table.iter().position(|slot| slot.is_none()) {
        return Ok(idx);
    }
    if table.len() < MAX_OPEN_FILES {
        table.push(None);
        return Ok(table.len() - 1);
    }
    Err(FsError::HandlesExhausted)
}

fn to_i32(v: u64) -> Result<i32, FsError> {
    i32::try_from(v).map_err(|_| FsError::TooLarge)
}

pub struct StdFileSystem {
    files: Vec<Option<File>>,
}

impl StdFileSystem {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    fn file(&mut self, handle: FileHandle) -> Result<&mut File, FsError> {
        self.files
            .get_mut(handle.0)
            .and_then(|f| f.as_mut())
            .ok_or(FsError::BadHandle(handle.0))
    }
}

impl Default for StdFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for StdFileSystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError> {
        let slot = free_slot(&mut self.files)?;
        let mut opts = OpenOptions::new();
        match mode {
            OpenMode::Read => opts.read(true),
            OpenMode::Write => opts.write(true).create(true).truncate(true),
            OpenMode::Append => opts.append(true).create(true),
            OpenMode::ReadWrite => opts.read(true).write(true).create(true),
        };
        let file = opts.open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            _ => FsError::Io(e),
        })?;
        self.files[slot] = Some(file);
        Ok(FileHandle(slot))
    }

    fn close(&mut self, handle: FileHandle) -> Result<(), FsError> {
        match self.files.get_mut(handle.0).and_then(|f| f.take()) {
            Some(_) => Ok(()),
            None => Err(FsError::BadHandle(handle.0)),
        }
    }

    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        Ok(self.file(handle)?.read(buf)?)
    }

    fn write(&mut self, handle: FileHandle, buf: &[u8]) -> Result<usize, FsError> {
        Ok(self.file(handle)?.write(buf)?)
    }

    fn flush(&mut self, handle: FileHandle) -> Result<(), FsError> {
        Ok(self.file(handle)?.flush()?)
    }

    fn set_pos(
        &mut self,
        handle: FileHandle,
        offset: i32,
        origin: SeekOrigin,
    ) -> Result<(), FsError> {
        let from = match origin {
            SeekOrigin::Set if offset < 0 => return Err(FsError::InvalidSeek),
            SeekOrigin::Set => SeekFrom::Start(offset as u64),
            SeekOrigin::Current => SeekFrom::Current(offset as i64),
            SeekOrigin::End => SeekFrom::End(offset as i64),
        };
        self.file(handle)?
            .seek(from)
            .map(|_| ())
            .map_err(|_| FsError::InvalidSeek)
    }

    fn get_pos(&mut self, handle: FileHandle) -> Result<i32, FsError> {
        let pos = self.file(handle)?.stream_position()?;
        to_i32(pos)
    }

    fn size(&mut self, handle: FileHandle) -> Result<i32, FsError> {
        let len = self.file(handle)?.metadata()?.len();
        to_i32(len)
    }

    fn truncate(&mut self, handle: FileHandle, len: i32) -> Result<(), FsError> {
        if len < 0 {
            return Err(FsError::InvalidSeek);
        }
        Ok(self.file(handle)?.set_len(len as u64)?)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        Ok(std::fs::rename(from, to)?)
    }

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        Ok(std::fs::remove_file(path)?)
    }

    fn exists(&self, path: &str) -> bool {
        std::path::Path::new(path).is_file()
    }
}

struct MemFile {
    path: String,
    pos: usize,
    append: bool,
}

#[derive(Default)]
struct MemState {
    files: HashMap<String, Vec<u8>>,
    open: Vec<Option<MemFile>>,
}

/// In-memory file system. Clones share the same files.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    state: Rc<RefCell<MemState>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        self.state
            .borrow_mut()
            .files
            .insert(path.to_string(), bytes.to_vec());
        self
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state.borrow().files.get(path).cloned()
    }

    fn with_open<T>(
        &self,
        handle: FileHandle,
        f: impl FnOnce(&mut MemFile, &mut Vec<u8>) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let mut state = self.state.borrow_mut();
        let MemState { files, open } = &mut *state;
        let file = open
            .get_mut(handle.0)
            .and_then(|f| f.as_mut())
            .ok_or(FsError::BadHandle(handle.0))?;
        let data = files
            .get_mut(&file.path)
            .ok_or_else(|| FsError::NotFound(file.path.clone()))?;
        f(file, data)
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle, FsError> {
        let mut state = self.state.borrow_mut();
        match mode {
            OpenMode::Read => {
                if !state.files.contains_key(path) {
                    return Err(FsError::NotFound(path.to_string()));
                }
            }
            OpenMode::Write => {
                state.files.insert(path.to_string(), Vec::new());
            }
            OpenMode::Append | OpenMode::ReadWrite => {
                state.files.entry(path.to_string()).or_default();
            }
        }
        let slot = free_slot(&mut state.open)?;
        state.open[slot] = Some(MemFile {
            path: path.to_string(),
            pos: 0,
            append: mode == OpenMode::Append,
        });
        Ok(FileHandle(slot))
    }

    fn close(&mut self, handle: FileHandle) -> Result<(), FsError> {
        let mut state = self.state.borrow_mut();
        match state.open.get_mut(handle.0).and_then(|f| f.take()) {
            Some(_) => Ok(()),
            None => Err(FsError::BadHandle(handle.0)),
        }
    }

    fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
        self.with_open(handle, |file, data| {
            let start = file.pos.min(data.len());
            let n = buf.len().min(data.len() - start);
            buf[..n].copy_from_slice(&data[start..start + n]);
            file.pos = start + n;
            Ok(n)
        })
    }

    fn write(&mut self, handle: FileHandle, buf: &[u8]) -> Result<usize, FsError> {
        self.with_open(handle, |file, data| {
            if file.append {
                file.pos = data.len();
            }
            let end = file.pos + buf.len();
            if end > data.len() {
                data.resize(end, 0);
            }
            data[file.pos..end].copy_from_slice(buf);
            file.pos = end;
            Ok(buf.len())
        })
    }

    fn flush(&mut self, handle: FileHandle) -> Result<(), FsError> {
        self.with_open(handle, |_, _| Ok(()))
    }

    fn set_pos(
        &mut self,
        handle: FileHandle,
        offset: i32,
        origin: SeekOrigin,
    ) -> Result<(), FsError> {
        self.with_open(handle, |file, data| {
            let base = match origin {
                SeekOrigin::Set => 0,
                SeekOrigin::Current => file.pos as i64,
                SeekOrigin::End => data.len() as i64,
            };
            let target = base + offset as i64;
            if target < 0 || target > i32::MAX as i64 {
                return Err(FsError::InvalidSeek);
            }
            file.pos = target as usize;
            Ok(())
        })
    }

    fn get_pos(&mut self, handle: FileHandle) -> Result<i32, FsError> {
        self.with_open(handle, |file, _| to_i32(file.pos as u64))
    }

    fn size(&mut self, handle: FileHandle) -> Result<i32, FsError> {
        self.with_open(handle, |_, data| to_i32(data.len() as u64))
    }

    fn truncate(&mut self, handle: FileHandle, len: i32) -> Result<(), FsError> {
        if len < 0 {
            return Err(FsError::InvalidSeek);
        }
        self.with_open(handle, |file, data| {
            data.resize(len as usize, 0);
            file.pos = file.pos.min(data.len());
            Ok(())
        })
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        let mut state = self.state.borrow_mut();
        let data = state
            .files
            .remove(from)
            .ok_or_else(|| FsError::NotFound(from.to_string()))?;
        state.files.insert(to.to_string(), data);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        let mut state = self.state.borrow_mut();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.state.borrow().files.contains_key(path)
    }
}
