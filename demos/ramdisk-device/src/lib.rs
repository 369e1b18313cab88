//! An in-memory, single-directory ramdisk [`Application`], loosely modeled
//! on a block-device filesystem: files consume accounted-for blocks out of
//! a fixed total, though for simplicity their bytes live directly in a
//! `Vec<u8>` rather than being paged through individual block buffers.
//!
//! Not a reference storage implementation — just enough to exercise every
//! corner of the `file-device` contract (OPEN/READ/WRITE/CLOSE/EXECUTE,
//! status, reset) end to end.

pub mod block_store;
pub mod error;
pub mod logging;

use file_device::Application;
use log::{debug, info, warn};

use block_store::BlockStore;
use error::DemoError;

const MAX_HANDLES: usize = 256; // MAX_DEVICES * 16 channels

struct FileEntry {
    name: Vec<u8>,
    data: Vec<u8>,
    blocks: usize,
}

enum Handle {
    Reading { bytes: Vec<u8>, pos: usize },
    Writing { file_index: usize },
}

pub struct RamdiskApp {
    store: BlockStore,
    files: Vec<FileEntry>,
    handles: Vec<Option<Handle>>,
    status: Option<Vec<u8>>,
}

impl Default for RamdiskApp {
    fn default() -> Self {
        Self::new()
    }
}

impl RamdiskApp {
    pub fn new() -> Self {
        Self {
            store: BlockStore::new(),
            files: Vec::new(),
            handles: (0..MAX_HANDLES).map(|_| None).collect(),
            status: None,
        }
    }

    fn slot(devnr: u8, channel: u8) -> usize {
        devnr as usize * 16 + channel as usize
    }

    fn find_file(&self, name: &[u8]) -> Option<usize> {
        self.files.iter().position(|f| f.name == name)
    }

    fn directory_listing(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"0 \"RAMDISK\"        RD 2A\r");
        for file in &self.files {
            out.extend_from_slice(format!("{:<5}", file.blocks.max(1)).as_bytes());
            out.push(b'"');
            out.extend_from_slice(&file.name);
            out.push(b'"');
            out.push(b'\r');
        }
        out.extend_from_slice(format!("{} BLOCKS FREE\r", self.store.free_blocks()).as_bytes());
        out
    }

    fn set_status(&mut self, code: u8, text: &str) {
        self.status = Some(format!("{code:02},{text},00,00\r").into_bytes());
    }

    fn scratch(&mut self, name: &[u8]) {
        if let Some(idx) = self.find_file(name) {
            self.store.free(self.files[idx].blocks);
            self.files.remove(idx);
            self.set_status(1, "FILES SCRATCHED");
        } else {
            self.set_status(62, "FILE NOT FOUND");
        }
    }
}

impl Application for RamdiskApp {
    fn open(&mut self, devnr: u8, channel: u8, name: &[u8]) -> bool {
        logging::set_current_devnr(Some(devnr));
        debug!("open ch{channel}: {:?}", String::from_utf8_lossy(name));
        let slot = Self::slot(devnr, channel);
        if name == b"$" {
            self.handles[slot] = Some(Handle::Reading {
                bytes: self.directory_listing(),
                pos: 0,
            });
            self.set_status(0, "OK");
            return true;
        }
        let handle = match self.find_file(name) {
            Some(idx) => Handle::Reading {
                bytes: self.files[idx].data.clone(),
                pos: 0,
            },
            None => {
                self.files.push(FileEntry {
                    name: name.to_vec(),
                    data: Vec::new(),
                    blocks: 0,
                });
                Handle::Writing {
                    file_index: self.files.len() - 1,
                }
            }
        };
        self.handles[slot] = Some(handle);
        self.set_status(0, "OK");
        true
    }

    fn close(&mut self, devnr: u8, channel: u8) {
        let slot = Self::slot(devnr, channel);
        self.handles[slot] = None;
    }

    fn read(&mut self, devnr: u8, channel: u8, buf: &mut [u8]) -> (usize, bool) {
        let slot = Self::slot(devnr, channel);
        match &mut self.handles[slot] {
            Some(Handle::Reading { bytes, pos }) => {
                if *pos >= bytes.len() {
                    return (0, true);
                }
                buf[0] = bytes[*pos];
                *pos += 1;
                (1, *pos >= bytes.len())
            }
            _ => (0, true),
        }
    }

    fn write(&mut self, devnr: u8, channel: u8, buf: &[u8], last_chunk: bool) -> usize {
        let slot = Self::slot(devnr, channel);
        let file_index = match &self.handles[slot] {
            Some(Handle::Writing { file_index }) => *file_index,
            _ => return 0,
        };
        let file = &mut self.files[file_index];
        let old_blocks = file.blocks;
        let new_len = file.data.len() + buf.len();
        let new_blocks = BlockStore::blocks_for_len(new_len);
        if let Err(e) = self.store.resize(old_blocks, new_blocks) {
            warn!("write ch{channel} rejected: {e}");
            return 0;
        }
        file.blocks = new_blocks;
        file.data.extend_from_slice(buf);
        if last_chunk {
            info!("wrote {} bytes to {:?}", file.data.len(), String::from_utf8_lossy(&file.name));
        }
        buf.len()
    }

    fn get_status(&mut self, _devnr: u8, buf: &mut [u8]) -> usize {
        let status = self
            .status
            .take()
            .unwrap_or_else(|| b"00, OK,00,00\r".to_vec());
        let n = status.len().min(buf.len());
        buf[..n].copy_from_slice(&status[..n]);
        n
    }

    fn execute(&mut self, devnr: u8, cmd: &[u8]) {
        logging::set_current_devnr(Some(devnr));
        debug!("execute: {:?}", String::from_utf8_lossy(cmd));
        match cmd.first() {
            Some(b'S') => {
                // S0:NAME or SNAME (scratch)
                let name = strip_drive_prefix(cmd);
                self.scratch(name);
            }
            Some(b'I') => self.set_status(0, "OK"),
            _ => self.set_status(31, "SYNTAX ERROR"),
        }
    }

    fn reset(&mut self) {
        info!("reset: closing all handles (files persist)");
        for handle in self.handles.iter_mut() {
            *handle = None;
        }
        self.status = None;
    }
}

/// Strip a leading `S`/`S0:`/`S0=` style drive-number prefix off a scratch
/// command, matching the loose convention real drives accept.
fn strip_drive_prefix(cmd: &[u8]) -> &[u8] {
    let rest = &cmd[1..];
    if let Some(pos) = rest.iter().position(|&b| b == b':') {
        &rest[pos + 1..]
    } else {
        rest
    }
}
