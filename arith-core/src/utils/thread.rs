use crate::field::Field;

/// Allocates `size` zeroed field elements with a single `alloc_zeroed` call.
///
/// Only sound for fields whose zero is the all-zero bit pattern, which holds
/// for Montgomery-form [`crate::field::Fp`].
pub fn unsafe_allocate_zero_vec<F: Field>(size: usize) -> Vec<F> {
    #[cfg(test)]
    {
        unsafe {
            let value = &F::zero();
            let ptr = value as *const F as *const u8;
            let bytes = std::slice::from_raw_parts(ptr, std::mem::size_of::<F>());
            assert!(bytes.iter().all(|&byte| byte == 0));
        }
    }

    if size == 0 || std::mem::size_of::<F>() == 0 {
        return Vec::new();
    }

    unsafe {
        let layout = std::alloc::Layout::array::<F>(size).unwrap();
        let ptr = std::alloc::alloc_zeroed(layout) as *mut F;

        if ptr.is_null() {
            std::alloc::handle_alloc_error(layout);
        }

        Vec::from_raw_parts(ptr, size, size)
    }
}
