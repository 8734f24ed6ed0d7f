use atomic_traits::Atomic;
use bytemuck::NoUninit;

use std::fmt;
use std::ops::{Add, Sub};
use std::sync::atomic::Ordering;

use crate::util::constants::BYTES_IN_WORD;
use crate::util::conversions;

/// A raw machine address: a heap word, a block descriptor, a stack slot or an info table.
///
/// Arithmetic is in bytes. Everything that dereferences the address is `unsafe`; the caller
/// vouches that the memory is mapped and holds a value of the requested type.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq, NoUninit)]
pub struct Address(usize);

impl Add<usize> for Address {
    type Output = Address;
    fn add(self, bytes: usize) -> Address {
        Address(self.0 + bytes)
    }
}

impl Sub<Address> for Address {
    type Output = usize;
    fn sub(self, lower: Address) -> usize {
        debug_assert!(self >= lower, "{} is below {}", self, lower);
        self.0 - lower.0
    }
}

impl Address {
    /// # Safety
    /// The result is only meaningful if `raw` came from a heap word or another `Address`.
    pub const unsafe fn from_usize(raw: usize) -> Address {
        Address(raw)
    }

    pub fn from_ref<T>(r: &T) -> Address {
        Address(r as *const T as usize)
    }

    pub fn from_mut_ptr<T>(ptr: *mut T) -> Address {
        Address(ptr as usize)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }

    pub fn to_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn to_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// The `n`-th word from here.
    pub const fn word(self, n: usize) -> Address {
        Address(self.0 + n * BYTES_IN_WORD)
    }

    /// Whole words from `lower` up to `self`.
    pub fn words_from(self, lower: Address) -> usize {
        (self - lower) / BYTES_IN_WORD
    }

    pub const fn align_down(self, align: usize) -> Address {
        Address(conversions::raw_align_down(self.0, align))
    }

    pub const fn is_aligned_to(self, align: usize) -> bool {
        conversions::raw_is_aligned(self.0, align)
    }

    /// # Safety
    /// The address must point to an initialised `T`.
    pub unsafe fn load<T: Copy>(self) -> T {
        *(self.0 as *const T)
    }

    /// Write `value` without dropping whatever was there.
    ///
    /// # Safety
    /// The address must be writable and aligned for `T`.
    pub unsafe fn store<T>(self, value: T) {
        (self.0 as *mut T).write(value);
    }

    /// # Safety
    /// The address must point to a live `T` for as long as the reference is used.
    pub unsafe fn as_ref<'a, T>(self) -> &'a T {
        &*self.to_ptr()
    }

    /// # Safety
    /// The address must be aligned for `T` and only accessed atomically while shared.
    pub unsafe fn atomic_load<T: Atomic>(self, order: Ordering) -> T::Type {
        self.as_ref::<T>().load(order)
    }

    /// # Safety
    /// As for [`Address::atomic_load`].
    pub unsafe fn atomic_store<T: Atomic>(self, val: T::Type, order: Ordering) {
        self.as_ref::<T>().store(val, order)
    }

    /// # Safety
    /// As for [`Address::atomic_load`].
    pub unsafe fn compare_exchange<T: Atomic>(
        self,
        old: T::Type,
        new: T::Type,
        success: Ordering,
        failure: Ordering,
    ) -> Result<T::Type, T::Type> {
        self.as_ref::<T>().compare_exchange(old, new, success, failure)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The address of a closure's header word.
///
/// No arithmetic: fields are reached through the views in [`crate::object::closure`]. Zero is
/// the null reference, which tracing skips.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq, NoUninit)]
pub struct ObjectReference(usize);

impl ObjectReference {
    pub const NULL: ObjectReference = ObjectReference(0);

    pub fn to_raw_address(self) -> Address {
        Address(self.0)
    }

    pub fn from_raw_address(addr: Address) -> ObjectReference {
        ObjectReference(addr.0)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The reference as the word stored in a pointer field.
    pub fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
