//! NativeValue: one slot of a native argument vector
//!
//! The toolkit's metacall loop hands the bridge a fixed-size vector of
//! untyped slots. Each slot is a NaN-boxed `u64` so that primitives and
//! object handles travel through the vector without allocation.
//!
//! # Encoding
//!
//! ```text
//! f64 (double): Any value where upper 13 bits != 0x1FFF (raw IEEE 754)
//! Tagged:       0xFFF8 + 3-bit tag + 48-bit payload (NaN-boxed)
//!   - handle:  0xFFF8000000000000 | (handle & 0xFFFFFFFFFFFF)   [tag=000]
//!   - i32:     0xFFF8001000000000 | (i32 as u64)                [tag=001]
//!   - bool:    0xFFF8002000000000 | (b as u64)                  [tag=010]
//!   - i64:     0xFFF8005000000000 | (i64 & 0xFFFFFFFFFFFF)      [tag=101]
//!   - null:    0xFFF8006000000000                               [tag=110]
//! ```
//!
//! Integers wider than 48 bits are truncated by the box; converters check
//! the range before boxing.

use crate::types::NativeHandle;

/// NaN-boxed 64-bit argument slot.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct NativeValue(u64);

const NAN_BOX_BASE: u64 = 0xFFF8_0000_0000_0000;
const TAG_SHIFT: u64 = 48;
const TAG_MASK: u64 = 0x7 << TAG_SHIFT;
const PAYLOAD_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;
const PAYLOAD_MASK_32: u64 = 0x0000_0000_FFFF_FFFF;

const TAG_HANDLE: u64 = 0x0 << TAG_SHIFT;
const TAG_I32: u64 = 0x1 << TAG_SHIFT;
const TAG_BOOL: u64 = 0x2 << TAG_SHIFT;
const TAG_I64: u64 = 0x5 << TAG_SHIFT;
const TAG_NULL: u64 = 0x6 << TAG_SHIFT;

const NULL_BITS: u64 = NAN_BOX_BASE | TAG_NULL;
const TRUE_BITS: u64 = NAN_BOX_BASE | TAG_BOOL | 1;
const FALSE_BITS: u64 = NAN_BOX_BASE | TAG_BOOL;

/// Smallest i64 representable in a slot (48-bit signed payload).
pub const SLOT_I64_MIN: i64 = -(1 << 47);
/// Largest i64 representable in a slot (48-bit signed payload).
pub const SLOT_I64_MAX: i64 = (1 << 47) - 1;

impl NativeValue {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create a null value
    #[inline]
    pub const fn null() -> Self {
        Self(NULL_BITS)
    }

    /// Create a boolean value
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Self(if b { TRUE_BITS } else { FALSE_BITS })
    }

    /// Create an i32 value
    #[inline]
    pub const fn i32(i: i32) -> Self {
        Self(NAN_BOX_BASE | TAG_I32 | ((i as u32) as u64))
    }

    /// Create an f64 value (stored as raw IEEE 754 double, not NaN-boxed)
    #[inline]
    pub fn f64(f: f64) -> Self {
        Self(f.to_bits())
    }

    /// Create an i64 value (truncated to the 48-bit payload)
    #[inline]
    pub const fn i64(i: i64) -> Self {
        Self(NAN_BOX_BASE | TAG_I64 | ((i as u64) & PAYLOAD_MASK))
    }

    /// Create a slot referring to a native object by handle
    #[inline]
    pub const fn handle(handle: NativeHandle) -> Self {
        Self(NAN_BOX_BASE | TAG_HANDLE | (handle.raw() & PAYLOAD_MASK))
    }

    // ========================================================================
    // Type checks
    // ========================================================================

    #[inline]
    const fn is_nan_boxed(&self) -> bool {
        (self.0 & NAN_BOX_BASE) == NAN_BOX_BASE
    }

    #[inline]
    const fn get_tag(&self) -> u64 {
        (self.0 & TAG_MASK) >> TAG_SHIFT
    }

    /// Check if value is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == NULL_BITS
    }

    #[inline]
    const fn has_tag(&self, tag: u64) -> bool {
        self.is_nan_boxed() && (self.0 & TAG_MASK) == tag
    }

    // ========================================================================
    // Extractors
    // ========================================================================

    /// Extract boolean value
    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        if self.has_tag(TAG_BOOL) {
            Some((self.0 & PAYLOAD_MASK) != 0)
        } else {
            None
        }
    }

    /// Extract i32 value
    #[inline]
    pub const fn as_i32(&self) -> Option<i32> {
        if self.has_tag(TAG_I32) {
            Some((self.0 & PAYLOAD_MASK_32) as u32 as i32)
        } else {
            None
        }
    }

    /// Extract f64 value
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        if !self.is_nan_boxed() {
            Some(f64::from_bits(self.0))
        } else {
            None
        }
    }

    /// Extract i64 value (sign-extended from 48 bits)
    #[inline]
    pub const fn as_i64(&self) -> Option<i64> {
        if self.has_tag(TAG_I64) {
            let payload = (self.0 & PAYLOAD_MASK) << 16;
            Some((payload as i64) >> 16)
        } else {
            None
        }
    }

    /// Extract an object handle
    #[inline]
    pub const fn as_handle(&self) -> Option<NativeHandle> {
        if self.has_tag(TAG_HANDLE) {
            Some(NativeHandle::from_raw(self.0 & PAYLOAD_MASK))
        } else {
            None
        }
    }

    /// Get type name for diagnostics
    pub const fn type_name(&self) -> &'static str {
        if !self.is_nan_boxed() {
            "double"
        } else {
            match self.get_tag() {
                0 => "handle",
                1 => "int",
                2 => "bool",
                5 => "qint64",
                6 => "null",
                _ => "unknown",
            }
        }
    }
}

impl Default for NativeValue {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_nan_boxed() {
            return write!(f, "NativeValue::F64({})", f64::from_bits(self.0));
        }
        match self.get_tag() {
            0 => write!(f, "NativeValue::Handle({:#x})", self.0 & PAYLOAD_MASK),
            1 => write!(f, "NativeValue::I32({})", (self.0 & PAYLOAD_MASK_32) as u32 as i32),
            2 => write!(f, "NativeValue::Bool({})", (self.0 & PAYLOAD_MASK) != 0),
            5 => write!(f, "NativeValue::I64({})", self.as_i64().unwrap_or_default()),
            6 => write!(f, "NativeValue::Null"),
            _ => write!(f, "NativeValue::Unknown({:#x})", self.0),
        }
    }
}
