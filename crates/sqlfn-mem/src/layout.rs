//! Storage size and alignment for values placed in engine memory.
//!
//! The engine's allocators guarantee 8-byte alignment. Types that need more
//! get `align - 1` bytes of slack and an aligned-up pointer; the engine only
//! ever sees the original base pointer.

use std::ffi::c_void;
use std::mem::{align_of, size_of};

/// Alignment guaranteed by `sqlite3_malloc64` and `sqlite3_aggregate_context`.
pub const ENGINE_ALIGN: usize = 8;

/// Bytes to request from the engine so that one `T` fits after alignment.
/// Never zero: the engine returns null for empty requests.
pub const fn storage_size<T>() -> usize {
    let size = if size_of::<T>() == 0 { 1 } else { size_of::<T>() };
    if align_of::<T>() > ENGINE_ALIGN {
        size + align_of::<T>() - 1
    } else {
        size
    }
}

/// Pointer to the `T` inside a block obtained for `storage_size::<T>()` bytes.
pub fn pointer_cast<T>(base: *mut c_void) -> *mut T {
    let align = align_of::<T>();
    let addr = base as usize;
    let offset = addr.wrapping_neg() & (align - 1);
    base.cast::<u8>().wrapping_add(offset).cast::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(32))]
    struct Wide(#[allow(dead_code)] [u8; 32]);

    #[test]
    fn ordinary_types_need_no_slack() {
        assert_eq!(storage_size::<u64>(), 8);
        assert_eq!(storage_size::<(u8, u32)>(), 8);
        assert_eq!(storage_size::<()>(), 1);
    }

    #[test]
    fn over_aligned_types_get_slack() {
        assert_eq!(storage_size::<Wide>(), 32 + 31);
    }

    #[test]
    fn pointer_cast_aligns_up() {
        let base = 0x1008usize as *mut c_void;
        assert_eq!(pointer_cast::<Wide>(base) as usize, 0x1020);
        assert_eq!(pointer_cast::<u64>(base) as usize, 0x1008);

        let aligned = 0x2000usize as *mut c_void;
        assert_eq!(pointer_cast::<Wide>(aligned) as usize, 0x2000);
    }

    #[test]
    fn aligned_value_fits_in_requested_block() {
        // Worst case: base sits 8 bytes past a 32-byte boundary.
        let base = 0x1008usize;
        let value = pointer_cast::<Wide>(base as *mut c_void) as usize;
        assert!(value + std::mem::size_of::<Wide>() <= base + storage_size::<Wide>());
    }
}
