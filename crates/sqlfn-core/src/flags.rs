//! Function registration flags.
//!
//! Bit values are the engine's `eTextRep` flags; they are passed through
//! unchanged at registration.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Text encoding a function or collation prefers to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    /// Native-endian UTF-16, chosen by the engine.
    Utf16,
}

impl TextEncoding {
    pub fn bits(self) -> i32 {
        match self {
            TextEncoding::Utf8 => 1,
            TextEncoding::Utf16Le => 2,
            TextEncoding::Utf16Be => 3,
            TextEncoding::Utf16 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FunctionFlags(i32);

impl FunctionFlags {
    const ENCODING_MASK: i32 = 0x0f;

    pub const NONE: FunctionFlags = FunctionFlags(0);
    pub const UTF8: FunctionFlags = FunctionFlags(1);
    pub const UTF16LE: FunctionFlags = FunctionFlags(2);
    pub const UTF16BE: FunctionFlags = FunctionFlags(3);
    pub const UTF16: FunctionFlags = FunctionFlags(4);
    /// Same inputs always give the same output; lets the planner factor calls.
    pub const DETERMINISTIC: FunctionFlags = FunctionFlags(0x0000_0800);
    /// Callable only from top-level SQL, never from triggers, views or schema.
    pub const DIRECT_ONLY: FunctionFlags = FunctionFlags(0x0008_0000);
    pub const SUBTYPE: FunctionFlags = FunctionFlags(0x0010_0000);
    pub const INNOCUOUS: FunctionFlags = FunctionFlags(0x0020_0000);

    pub const fn from_bits(bits: i32) -> Self {
        FunctionFlags(bits)
    }

    /// Raw bits as given, without the encoding default.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Bits handed to the engine. UTF-8 is assumed when no encoding bit is set.
    pub fn bits(self) -> i32 {
        if self.0 & Self::ENCODING_MASK == 0 {
            self.0 | TextEncoding::Utf8.bits()
        } else {
            self.0
        }
    }

    pub fn contains(self, other: FunctionFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with_encoding(self, encoding: TextEncoding) -> Self {
        FunctionFlags((self.0 & !Self::ENCODING_MASK) | encoding.bits())
    }

    pub fn encoding(self) -> TextEncoding {
        match self.bits() & Self::ENCODING_MASK {
            2 => TextEncoding::Utf16Le,
            3 => TextEncoding::Utf16Be,
            4 => TextEncoding::Utf16,
            _ => TextEncoding::Utf8,
        }
    }
}

impl BitOr for FunctionFlags {
    type Output = FunctionFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        FunctionFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for FunctionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_defaults_to_utf8() {
        assert_eq!(FunctionFlags::DETERMINISTIC.bits(), 0x801);
        assert_eq!(FunctionFlags::NONE.bits(), 1);
        assert_eq!(FunctionFlags::DETERMINISTIC.encoding(), TextEncoding::Utf8);
    }

    #[test]
    fn explicit_encoding_is_kept() {
        let flags = FunctionFlags::UTF16LE | FunctionFlags::INNOCUOUS;
        assert_eq!(flags.bits(), 0x0020_0002);
        assert_eq!(flags.encoding(), TextEncoding::Utf16Le);

        let switched = flags.with_encoding(TextEncoding::Utf8);
        assert_eq!(switched.encoding(), TextEncoding::Utf8);
        assert!(switched.contains(FunctionFlags::INNOCUOUS));
    }

    #[test]
    fn contains_checks_every_bit() {
        let flags = FunctionFlags::DETERMINISTIC | FunctionFlags::DIRECT_ONLY;
        assert!(flags.contains(FunctionFlags::DETERMINISTIC));
        assert!(flags.contains(FunctionFlags::DETERMINISTIC | FunctionFlags::DIRECT_ONLY));
        assert!(!flags.contains(FunctionFlags::INNOCUOUS));
    }
}
