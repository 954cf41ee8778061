//! Windows API layer backing live process access
//!
//! All unsafe FFI calls are contained within this module.

pub mod bindings {
    //! Low-level FFI bindings to Windows system libraries

    pub mod kernel32;
}

pub use bindings::kernel32;
