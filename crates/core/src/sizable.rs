//! In-memory size estimation
//!
//! The store keeps a running total of how much memory its entries occupy.
//! Exact accounting is neither possible nor needed; these helpers give a
//! stable, cheap approximation that is computed once per object and cached.

/// Allows the estimation of the in-memory size of an object
pub trait Sizable {
    /// Estimated number of bytes this object occupies on the heap and inline
    fn estimated_size(&self) -> usize;
}

/// Fixed overhead of a heap-allocated object header
pub const OBJECT_SHELL_SIZE: usize = 16;
/// Size of a pointer or reference
pub const REF_SIZE: usize = 8;
/// Size of an `i64`/`u64`
pub const LONG_SIZE: usize = 8;
/// Size of a fieldless enum discriminant
pub const ENUM_SIZE: usize = 1;
/// Size of a `bool`
pub const BOOL_SIZE: usize = 1;
/// Overhead of a `Vec`/`String` header (ptr, len, capacity)
pub const VEC_HEADER_SIZE: usize = 24;

/// Estimated size of an optional string, header included
#[inline]
pub fn string_size(s: Option<&str>) -> usize {
    match s {
        Some(s) => VEC_HEADER_SIZE + s.len(),
        None => REF_SIZE,
    }
}

/// Estimated size of an optional byte buffer, header included
#[inline]
pub fn byte_array_size(bytes: Option<&[u8]>) -> usize {
    match bytes {
        Some(b) => VEC_HEADER_SIZE + b.len(),
        None => REF_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_size() {
        assert_eq!(string_size(None), REF_SIZE);
        assert_eq!(string_size(Some("")), VEC_HEADER_SIZE);
        assert_eq!(string_size(Some("topic")), VEC_HEADER_SIZE + 5);
    }

    #[test]
    fn test_byte_array_size() {
        assert_eq!(byte_array_size(None), REF_SIZE);
        assert_eq!(byte_array_size(Some(&[1, 2, 3])), VEC_HEADER_SIZE + 3);
    }
}
