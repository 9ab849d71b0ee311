//! Raw binary files of plain values, the format node orders are exchanged in.
//!
//! A file holds the in-memory representation of a `Vec<T>` without any header,
//! so for a node order it is just the sequence of `u32` node ids by ascending rank.
//!
//! ```no_run
//! # use rust_traffic_assignment::io::*;
//! let order = Vec::<u32>::load_from("cch_perm")?;
//! order.write_to(&"cch_perm_copy")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    fs::File,
    io::{Error, ErrorKind, Read, Result, Write},
    mem,
    path::Path,
    slice,
};

/// Plain old data which can be reinterpreted as bytes and back.
///
/// # Safety
///
/// Implementors must not contain padding or pointers and every bit pattern must be a valid value.
pub unsafe trait Pod: Copy + Default {}

unsafe impl Pod for u32 {}
unsafe impl Pod for u64 {}
unsafe impl Pod for f64 {}

fn as_bytes<T: Pod>(data: &[T]) -> &[u8] {
    unsafe { slice::from_raw_parts(data.as_ptr() as *const u8, mem::size_of_val(data)) }
}

fn as_bytes_mut<T: Pod>(data: &mut [T]) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(data.as_mut_ptr() as *mut u8, mem::size_of_val(data)) }
}

pub trait Store {
    fn write_to(&self, path: &dyn AsRef<Path>) -> Result<()>;
}

impl<T: Pod> Store for [T] {
    fn write_to(&self, path: &dyn AsRef<Path>) -> Result<()> {
        File::create(path)?.write_all(as_bytes(self))
    }
}

impl<T: Pod> Store for Vec<T> {
    fn write_to(&self, path: &dyn AsRef<Path>) -> Result<()> {
        self[..].write_to(path)
    }
}

pub trait Load: Sized {
    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self>;
}

impl<T: Pod> Load for Vec<T> {
    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let num_bytes = file.metadata()?.len() as usize;
        if num_bytes % mem::size_of::<T>() != 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("file size {} is not a multiple of the element size {}", num_bytes, mem::size_of::<T>()),
            ));
        }
        let mut data = vec![T::default(); num_bytes / mem::size_of::<T>()];
        file.read_exact(as_bytes_mut(&mut data))?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_vectors_load_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order");
        let order: Vec<u32> = vec![3, 0, 2, 1];
        order.write_to(&path).unwrap();
        assert_eq!(Vec::<u32>::load_from(&path).unwrap(), order);
        assert_eq!(Vec::<u64>::load_from(&path).unwrap().len(), 2);
        assert!(Vec::<u64>::load_from(&dir.path().join("missing")).is_err());
    }
}
