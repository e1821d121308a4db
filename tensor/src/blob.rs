use std::{
    alloc::{alloc_zeroed, dealloc, Layout},
    mem::align_of,
    ops::{Deref, DerefMut},
    ptr::NonNull,
    slice::{from_raw_parts, from_raw_parts_mut},
};

/// 可改变长度的张量存储。
pub trait Storage: DerefMut<Target = [u8]> {
    /// 改变存储长度，不保留原有内容。
    fn resize(&mut self, len: usize);
}

/// A zero-initialized byte array aligned to `usize`.
pub struct Blob {
    ptr: NonNull<u8>,
    len: usize,
}

unsafe impl Send for Blob {}
unsafe impl Sync for Blob {}

const ALIGN: usize = align_of::<usize>();

impl Blob {
    #[inline]
    pub fn new(size: usize) -> Self {
        if size == 0 {
            return Self {
                ptr: NonNull::<usize>::dangling().cast(),
                len: 0,
            };
        }
        let layout = Layout::from_size_align(size, ALIGN).unwrap();
        Self {
            ptr: NonNull::new(unsafe { alloc_zeroed(layout) }).unwrap(),
            len: size,
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        let mut ans = Self::new(data.len());
        ans.copy_from_slice(data);
        ans
    }
}

impl Drop for Blob {
    #[inline]
    fn drop(&mut self) {
        if self.len > 0 {
            let layout = Layout::from_size_align(self.len, ALIGN).unwrap();
            unsafe { dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}

impl Deref for Blob {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        unsafe { from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for Blob {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Storage for Blob {
    #[inline]
    fn resize(&mut self, len: usize) {
        if self.len != len {
            *self = Self::new(len);
        }
    }
}

impl Storage for Vec<u8> {
    #[inline]
    fn resize(&mut self, len: usize) {
        Vec::resize(self, len, 0);
    }
}

#[test]
fn test() {
    let mut blob = Blob::new(0);
    assert!(blob.is_empty());

    blob.resize(12);
    assert_eq!(&*blob, &[0; 12]);
    assert_eq!(blob.as_ptr() as usize % ALIGN, 0);

    blob[3] = 7;
    let copy = Blob::from_slice(&blob);
    assert_eq!(copy[3], 7);
}
