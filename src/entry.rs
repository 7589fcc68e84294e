//! Cache entries and per-value size estimation.
//!
//! A [`CacheEntry`] is built by the caller and handed to
//! [`LruCache::put`](crate::cache::LruCache::put). Its `size` is fixed at
//! construction: either supplied explicitly with [`CacheEntry::new`] or
//! estimated from the value with [`CacheEntry::sized`] via [`MemSize`].
//!
//! The recency links for an entry are kept by the cache's
//! [`RecencyList`](crate::ds::RecencyList), not by the entry itself.

use std::mem;
use std::sync::Arc;

/// Estimated number of bytes a value occupies, heap included.
pub trait MemSize {
    fn mem_size(&self) -> usize;
}

macro_rules! impl_mem_size_fixed {
    ($($t:ty),* $(,)?) => {
        $(
            impl MemSize for $t {
                #[inline]
                fn mem_size(&self) -> usize {
                    mem::size_of::<$t>()
                }
            }
        )*
    };
}

impl_mem_size_fixed!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);

impl MemSize for String {
    fn mem_size(&self) -> usize {
        mem::size_of::<String>() + self.capacity()
    }
}

impl MemSize for str {
    fn mem_size(&self) -> usize {
        self.len()
    }
}

impl<T: MemSize> MemSize for [T] {
    fn mem_size(&self) -> usize {
        self.iter().map(MemSize::mem_size).sum()
    }
}

impl<T: MemSize> MemSize for Vec<T> {
    fn mem_size(&self) -> usize {
        let spare = (self.capacity() - self.len()) * mem::size_of::<T>();
        mem::size_of::<Vec<T>>() + spare + self.as_slice().mem_size()
    }
}

impl<T: MemSize + ?Sized> MemSize for Box<T> {
    fn mem_size(&self) -> usize {
        mem::size_of::<Box<T>>() + (**self).mem_size()
    }
}

impl<T: MemSize + ?Sized> MemSize for Arc<T> {
    fn mem_size(&self) -> usize {
        mem::size_of::<Arc<T>>() + (**self).mem_size()
    }
}

impl<T: MemSize> MemSize for Option<T> {
    fn mem_size(&self) -> usize {
        match self {
            Some(value) => mem::size_of::<Option<T>>() - mem::size_of::<T>() + value.mem_size(),
            None => mem::size_of::<Option<T>>(),
        }
    }
}

/// A key, its shared value, the bytes attributed to it, and when it was last touched.
#[derive(Debug)]
pub struct CacheEntry<K, V> {
    key: K,
    value: Arc<V>,
    size: u64,
    last_touched: u64,
}

impl<K, V> CacheEntry<K, V> {
    /// Builds an entry with an explicit byte cost.
    pub fn new(key: K, value: V, size: u64) -> Self {
        Self::from_arc(key, Arc::new(value), size)
    }

    /// Builds an entry around an already shared value.
    pub fn from_arc(key: K, value: Arc<V>, size: u64) -> Self {
        Self {
            key,
            value,
            size,
            last_touched: 0,
        }
    }

    /// Builds an entry whose size is estimated from the value.
    pub fn sized(key: K, value: V) -> Self
    where
        V: MemSize,
    {
        let size = value.mem_size() as u64;
        Self::new(key, value, size)
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Microsecond timestamp of the last insert or read; `0` until inserted.
    pub fn last_touched(&self) -> u64 {
        self.last_touched
    }

    pub fn into_parts(self) -> (K, Arc<V>) {
        (self.key, self.value)
    }

    pub(crate) fn touch(&mut self, now_micros: u64) {
        self.last_touched = now_micros;
    }
}

impl<K: Clone, V> Clone for CacheEntry<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: Arc::clone(&self.value),
            size: self.size,
            last_touched: self.last_touched,
        }
    }
}
