//! Kernel32.dll bindings for process memory access

use crate::core::types::{Address, MemoryError, MemoryResult};
use std::io;
use winapi::shared::minwindef::{FALSE, LPCVOID, LPVOID};
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::winnt::HANDLE;

/// Safe wrapper for OpenProcess
pub fn open_process(pid: u32, desired_access: u32) -> MemoryResult<HANDLE> {
    let handle = unsafe { OpenProcess(desired_access, FALSE, pid) };
    if handle.is_null() {
        Err(MemoryError::IoError(io::Error::last_os_error()))
    } else {
        Ok(handle)
    }
}

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle that is not used afterwards
pub unsafe fn close_handle(handle: HANDLE) -> MemoryResult<()> {
    if handle.is_null() {
        return Ok(());
    }

    if CloseHandle(handle) == FALSE {
        Err(MemoryError::IoError(io::Error::last_os_error()))
    } else {
        Ok(())
    }
}

/// Fill `buffer` from `address` in the target.
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_READ`
pub unsafe fn read_process_memory(
    handle: HANDLE,
    address: Address,
    buffer: &mut [u8],
) -> MemoryResult<usize> {
    let mut bytes_read = 0;

    let result = ReadProcessMemory(
        handle,
        address.as_u64() as usize as LPCVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE {
        Err(MemoryError::read_failed(
            address,
            format!("ReadProcessMemory failed: {}", io::Error::last_os_error()),
        ))
    } else {
        Ok(bytes_read)
    }
}

/// Copy `data` to `address` in the target.
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_WRITE` and
/// `PROCESS_VM_OPERATION`
pub unsafe fn write_process_memory(
    handle: HANDLE,
    address: Address,
    data: &[u8],
) -> MemoryResult<usize> {
    let mut bytes_written = 0;

    let result = WriteProcessMemory(
        handle,
        address.as_u64() as usize as LPVOID,
        data.as_ptr() as LPCVOID,
        data.len(),
        &mut bytes_written,
    );

    if result == FALSE {
        Err(MemoryError::write_failed(
            address,
            format!("WriteProcessMemory failed: {}", io::Error::last_os_error()),
        ))
    } else {
        Ok(bytes_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_null_handle_operations() {
        unsafe {
            assert!(close_handle(ptr::null_mut()).is_ok());

            let mut buffer = vec![0u8; 4];
            assert!(matches!(
                read_process_memory(ptr::null_mut(), Address::new(0x1000), &mut buffer),
                Err(MemoryError::ForeignReadFailure { .. })
            ));

            let data = vec![0u8; 4];
            assert!(matches!(
                write_process_memory(ptr::null_mut(), Address::new(0x1000), &data),
                Err(MemoryError::ForeignWriteFailure { .. })
            ));
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_invalid_process() {
        use winapi::um::winnt::PROCESS_VM_READ;
        assert!(open_process(0, PROCESS_VM_READ).is_err());
    }
}
