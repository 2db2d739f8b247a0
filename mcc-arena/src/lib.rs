//! Bump arena and string interner.
//!
//! Every name the compiler ever creates (identifier spellings, alpha-renamed
//! variables, `$N` temporaries, branch labels) lives for the whole
//! compilation and is never freed individually. The [`Arena`] is a single
//! contiguous buffer with a bump cursor that matches that lifecycle: O(1)
//! allocation, in-place growth of the most recent allocation, and a bulk
//! [`Arena::reset`]. The [`StringInterner`] layers name deduplication on top
//! and hands out copyable [`Symbol`] handles, so the rest of the compiler
//! compares and stores names as 32-bit values.

#![deny(missing_docs)]

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::ptr::NonNull;

use mcc_entity::entity_impl;

/// Worst-case alignment served by an arena buffer.
const ARENA_ALIGN: usize = 16;

/// A fixed-capacity bump allocator.
///
/// Allocation moves a cursor forward through a single buffer; nothing is ever
/// freed individually. The most recent allocation can be grown in place,
/// which gives amortized O(1) appends to a buffer that is being assembled at
/// the end of the arena. `reset` rewinds the cursor to the start of the
/// buffer; it takes `&mut self`, so the borrow checker guarantees no
/// allocation handed out earlier is still live.
///
/// Exhausting the arena is a compiler bug, not a user error: the panicking
/// entry points abort compilation with a "fatal error" message.
pub struct Arena {
    buf: NonNull<u8>,
    capacity: usize,
    /// Offset of the first free byte.
    cursor: Cell<usize>,
    /// Offset of the most recent allocation, `== cursor` when there is none.
    last: Cell<usize>,
}

impl Arena {
    /// Create an arena with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "arena capacity must be nonzero");
        let layout = Layout::from_size_align(capacity, ARENA_ALIGN).expect("arena layout");
        // The buffer is uninitialized; allocations copy their contents in
        // before any read happens.
        let buf = unsafe { alloc(layout) };
        let buf = NonNull::new(buf).unwrap_or_else(|| handle_alloc_error(layout));
        Self {
            buf,
            capacity,
            cursor: Cell::new(0),
            last: Cell::new(0),
        }
    }

    /// Total buffer size in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes consumed so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Allocate `size` bytes aligned to `align`, or `None` if the remaining
    /// space is too small. `align` must be a power of two no larger than 16.
    pub fn try_alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        debug_assert!(align.is_power_of_two() && align <= ARENA_ALIGN);
        let offset = (self.cursor.get() + align - 1) & !(align - 1);
        if offset > self.capacity || size > self.capacity - offset {
            return None;
        }
        self.last.set(offset);
        self.cursor.set(offset + size);
        // Within bounds: offset + size <= capacity was just checked.
        Some(unsafe { NonNull::new_unchecked(self.buf.as_ptr().add(offset)) })
    }

    /// Allocate `size` bytes aligned to `align`.
    ///
    /// Aborts compilation when the arena is exhausted.
    pub fn alloc(&self, size: usize, align: usize) -> NonNull<u8> {
        match self.try_alloc(size, align) {
            Some(p) => p,
            None => panic!(
                "fatal error: arena exhausted ({} of {} bytes used, requested {})",
                self.cursor.get(),
                self.capacity,
                size
            ),
        }
    }

    /// Resize an allocation previously obtained from this arena.
    ///
    /// When `old` is the most recent allocation it is grown (or shrunk) in
    /// place and the same pointer is returned; otherwise a new block is
    /// allocated and `old_size` bytes are copied over.
    pub fn realloc(
        &self,
        old: NonNull<u8>,
        old_size: usize,
        new_size: usize,
        align: usize,
    ) -> NonNull<u8> {
        let offset = (old.as_ptr() as usize) - (self.buf.as_ptr() as usize);
        if offset == self.last.get() && offset & (align - 1) == 0 {
            if new_size > self.capacity - offset {
                panic!(
                    "fatal error: arena exhausted ({} of {} bytes used, requested {})",
                    self.cursor.get(),
                    self.capacity,
                    new_size
                );
            }
            self.cursor.set(offset + new_size);
            return old;
        }
        let new = self.alloc(new_size, align);
        // The two blocks never overlap: `new` sits past the old cursor.
        unsafe {
            std::ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), old_size.min(new_size));
        }
        new
    }

    /// Copy `s` into the arena and return the stored slice.
    pub fn alloc_str(&self, s: &str) -> &str {
        if s.is_empty() {
            return "";
        }
        let p = self.alloc(s.len(), 1);
        unsafe {
            std::ptr::copy_nonoverlapping(s.as_ptr(), p.as_ptr(), s.len());
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(p.as_ptr(), s.len()))
        }
    }

    /// Rewind the cursor to the start of the buffer, discarding every
    /// allocation at once.
    pub fn reset(&mut self) {
        self.cursor.set(0);
        self.last.set(0);
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let layout = Layout::from_size_align(self.capacity, ARENA_ALIGN).expect("arena layout");
        unsafe { dealloc(self.buf.as_ptr(), layout) };
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Arena({}/{} bytes)", self.used(), self.capacity)
    }
}

/// An interned string.
///
/// Symbols are cheap to copy and compare; the spelling is resolved through
/// the [`StringInterner`] that produced them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Symbol(u32);
entity_impl!(Symbol);

/// Deduplicating storage for names.
///
/// String bytes live in the interner's arena; the index maps a spelling to
/// the [`Symbol`] that owns it, so interning the same spelling twice yields
/// the same symbol.
pub struct StringInterner {
    arena: Arena,
    index: HashMap<&'static str, Symbol>,
    strings: mcc_entity::PrimaryMap<Symbol, &'static str>,
}

impl StringInterner {
    /// Default arena capacity: generous for a single translation unit.
    const DEFAULT_CAPACITY: usize = 1 << 20;

    /// Create an interner with the default arena capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create an interner whose arena holds `bytes` bytes of string data.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            arena: Arena::with_capacity(bytes),
            index: HashMap::new(),
            strings: mcc_entity::PrimaryMap::new(),
        }
    }

    /// Intern `s`, returning the existing symbol when the spelling was seen
    /// before.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.index.get(s) {
            return sym;
        }
        let stored = self.arena.alloc_str(s);
        // Safety: the arena buffer never moves and is only freed when the
        // interner itself is dropped, together with `index` and `strings`.
        // The 'static slices never escape this struct: `resolve` reborrows
        // them at `&self` lifetime.
        let stored: &'static str = unsafe { std::mem::transmute::<&str, &'static str>(stored) };
        let sym = self.strings.push(stored);
        self.index.insert(stored, sym);
        sym
    }

    /// Get the spelling of `sym`.
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings[sym]
    }

    /// Number of distinct spellings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether no spelling has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "StringInterner({} strings, {:?})",
            self.strings.len(),
            self.arena
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_bumps_cursor() {
        let arena = Arena::with_capacity(64);
        assert_eq!(arena.used(), 0);
        arena.alloc(3, 1);
        assert_eq!(arena.used(), 3);
        // 8-byte alignment skips the padding bytes.
        arena.alloc(8, 8);
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn reset_restores_initial_cursor() {
        let mut arena = Arena::with_capacity(64);
        arena.alloc(10, 1);
        arena.alloc(10, 2);
        assert!(arena.used() > 0);
        arena.reset();
        assert_eq!(arena.used(), 0);
        let p = arena.alloc(1, 1);
        // After a reset the next allocation starts at the buffer again.
        assert_eq!(p.as_ptr() as usize % ARENA_ALIGN, 0);
    }

    #[test]
    fn realloc_of_most_recent_is_in_place() {
        let arena = Arena::with_capacity(64);
        arena.alloc(5, 1);
        let p = arena.alloc(4, 4);
        let q = arena.realloc(p, 4, 12, 4);
        assert_eq!(p, q);
        assert_eq!(arena.used(), 20);
        // Shrinking in place moves the cursor back.
        let r = arena.realloc(q, 12, 8, 4);
        assert_eq!(q, r);
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn realloc_of_older_block_copies() {
        let arena = Arena::with_capacity(64);
        let p = arena.alloc_str("abcd");
        arena.alloc(1, 1);
        let old = NonNull::new(p.as_ptr() as *mut u8).unwrap();
        let q = arena.realloc(old, 4, 8, 1);
        assert_ne!(old, q);
        let copied = unsafe { std::slice::from_raw_parts(q.as_ptr(), 4) };
        assert_eq!(copied, b"abcd");
    }

    #[test]
    fn exhaustion_is_detected() {
        let arena = Arena::with_capacity(16);
        assert!(arena.try_alloc(16, 1).is_some());
        assert!(arena.try_alloc(1, 1).is_none());
    }

    #[test]
    #[should_panic(expected = "fatal error")]
    fn exhaustion_aborts() {
        let arena = Arena::with_capacity(16);
        arena.alloc(32, 1);
    }

    #[test]
    fn strings_survive_later_allocations() {
        let arena = Arena::with_capacity(256);
        let a = arena.alloc_str("first");
        let b = arena.alloc_str("second");
        assert_eq!(a, "first");
        assert_eq!(b, "second");
    }

    #[test]
    fn interner_deduplicates() {
        let mut syms = StringInterner::with_capacity(256);
        let a = syms.intern("main");
        let b = syms.intern("main");
        let c = syms.intern("other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(syms.resolve(a), "main");
        assert_eq!(syms.resolve(c), "other");
        assert_eq!(syms.len(), 2);
    }
}
