use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A 32-bit TCP sequence number. All ordering is modular: `a` precedes `b`
/// when the signed 32-bit difference `a - b` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Wrap32 {
    value: u32,
}

impl Wrap32 {
    pub const fn new(value: u32) -> Self {
        Wrap32 { value }
    }

    pub const fn value(self) -> u32 {
        self.value
    }

    /// `self < other` modulo 2^32
    pub fn seq_lt(self, other: Wrap32) -> bool {
        (self - other) < 0
    }

    /// `self <= other` modulo 2^32
    pub fn seq_leq(self, other: Wrap32) -> bool {
        (self - other) <= 0
    }

    /// `self > other` modulo 2^32
    pub fn seq_gt(self, other: Wrap32) -> bool {
        (self - other) > 0
    }

    /// `self >= other` modulo 2^32
    pub fn seq_geq(self, other: Wrap32) -> bool {
        (self - other) >= 0
    }

    /// The later of the two sequence numbers.
    pub fn seq_max(self, other: Wrap32) -> Wrap32 {
        if self.seq_gt(other) {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Wrap32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Add<u32> for Wrap32 {
    type Output = Wrap32;

    fn add(self, rhs: u32) -> Wrap32 {
        Wrap32::new(self.value.wrapping_add(rhs))
    }
}

impl AddAssign<u32> for Wrap32 {
    fn add_assign(&mut self, rhs: u32) {
        self.value = self.value.wrapping_add(rhs);
    }
}

impl Sub<u32> for Wrap32 {
    type Output = Wrap32;

    fn sub(self, rhs: u32) -> Wrap32 {
        Wrap32::new(self.value.wrapping_sub(rhs))
    }
}

impl SubAssign<u32> for Wrap32 {
    fn sub_assign(&mut self, rhs: u32) {
        self.value = self.value.wrapping_sub(rhs);
    }
}

/// Signed distance between two sequence numbers.
impl Sub for Wrap32 {
    type Output = i32;

    fn sub(self, other: Wrap32) -> i32 {
        self.value.wrapping_sub(other.value) as i32
    }
}

// -- Unit tests --
