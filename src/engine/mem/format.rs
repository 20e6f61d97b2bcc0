//! Container format constants.
//!
//! ```text
//! magic "H5Vnr" (5) | flags u8 | version u16 | body length u64 | body
//! body  := node
//! node  := 0u8 group      : u32 nlinks, nlinks x (u32 len, name bytes, node)
//!        | 1u8 dataset    : type desc, u32 rank, rank x u64 dims,
//!                           u8 deflate level, u64 len, payload
//!        | 2u8 named type : type desc
//! type desc := u8 class, u8 size, u8 signed
//! ```
//!
//! All integers are little-endian.

/// Magic bytes at the start of a container file.
pub const MAGIC: &[u8; 5] = b"H5Vnr";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the flags byte in the header.
pub const FLAGS_OFFSET: usize = 5;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the body length in the header.
pub const BODY_LEN_OFFSET: usize = 8;

/// Current format version.
pub const CURRENT_VERSION: u16 = 1;

/// Flag set once the writer has finished the body.
pub const FLAG_COMPLETE: u8 = 0x01;

pub const TAG_GROUP: u8 = 0;
pub const TAG_DATASET: u8 = 1;
pub const TAG_NAMED_TYPE: u8 = 2;

/// Largest accepted dataset rank.
pub const MAX_RANK: u32 = 32;

/// Check whether `data` starts with a complete container header.
#[inline]
pub fn has_magic(data: &[u8]) -> bool {
    data.len() >= HEADER_SIZE && &data[..MAGIC.len()] == MAGIC
}
