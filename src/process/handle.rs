//! Process handle implementing foreign memory access

use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::memory::ForeignMemory;
use crate::windows::bindings::kernel32;
use std::fmt;
use std::ptr;
use tracing::{debug, warn};
use winapi::um::winnt::{
    HANDLE, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

/// Access rights for process handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessAccess {
    value: u32,
}

impl ProcessAccess {
    pub const QUERY_INFORMATION: Self = Self {
        value: PROCESS_QUERY_INFORMATION,
    };
    pub const VM_READ: Self = Self {
        value: PROCESS_VM_READ,
    };
    pub const VM_WRITE: Self = Self {
        value: PROCESS_VM_WRITE,
    };
    pub const VM_OPERATION: Self = Self {
        value: PROCESS_VM_OPERATION,
    };

    /// Rights needed to inspect and edit
    pub const INSPECT: Self = Self {
        value: PROCESS_QUERY_INFORMATION | PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION,
    };

    /// Combine access rights
    pub fn combine(rights: &[Self]) -> Self {
        let value = rights.iter().fold(0, |acc, right| acc | right.value);
        Self { value }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn contains(&self, other: Self) -> bool {
        self.value & other.value == other.value
    }
}

/// Process HANDLE closed when the owning [`ProcessHandle`] goes away
struct OwnedHandle(HANDLE);

impl OwnedHandle {
    fn null() -> Self {
        OwnedHandle(ptr::null_mut())
    }

    fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        if let Err(err) = unsafe { kernel32::close_handle(self.0) } {
            warn!("Failed to close process handle: {}", err);
        }
    }
}

// Process handles may be used from any thread of the owning process
unsafe impl Send for OwnedHandle {}
unsafe impl Sync for OwnedHandle {}

/// An opened process whose memory can be inspected
pub struct ProcessHandle {
    handle: OwnedHandle,
    pid: u32,
    access: ProcessAccess,
}

impl ProcessHandle {
    /// Open a process with specified access rights
    pub fn open(pid: u32, access: ProcessAccess) -> MemoryResult<Self> {
        let raw_handle = kernel32::open_process(pid, access.value())?;
        debug!("Opened process {} with access 0x{:X}", pid, access.value());
        Ok(ProcessHandle {
            handle: OwnedHandle(raw_handle),
            pid,
            access,
        })
    }

    /// Open a process for reading and editing memory
    pub fn open_for_inspection(pid: u32) -> MemoryResult<Self> {
        Self::open(pid, ProcessAccess::INSPECT)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn access(&self) -> ProcessAccess {
        self.access
    }

    pub fn is_valid(&self) -> bool {
        !self.handle.is_null()
    }
}

impl ForeignMemory for ProcessHandle {
    fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        if !self.is_valid() {
            return Err(MemoryError::read_failed(address, "process handle is null"));
        }
        let mut buffer = vec![0u8; size];
        let read = unsafe { kernel32::read_process_memory(self.handle.0, address, &mut buffer)? };
        buffer.truncate(read);
        Ok(buffer)
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        if !self.is_valid() {
            return Err(MemoryError::write_failed(address, "process handle is null"));
        }
        if !self.access.contains(ProcessAccess::VM_WRITE) {
            return Err(MemoryError::write_failed(
                address,
                "process was opened without write access",
            ));
        }
        let written = unsafe { kernel32::write_process_memory(self.handle.0, address, data)? };
        if written != data.len() {
            return Err(MemoryError::write_failed(
                address,
                format!("partial write: {} of {} bytes", written, data.len()),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("valid", &self.is_valid())
            .field("access", &format!("0x{:X}", self.access.value()))
            .finish()
    }
}
