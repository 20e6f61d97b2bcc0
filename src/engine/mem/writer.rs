//! Container format writer.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::format::*;
use super::image::{Image, Node, NodeId};
use crate::engine::EngineResult;
use crate::util::NativeType;

/// Output stream over a byte buffer.
pub struct OStream {
    buf: Vec<u8>,
}

impl OStream {
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(4096) }
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> EngineResult<()> {
        self.buf.write_all(data)?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> EngineResult<()> {
        self.buf.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> EngineResult<()> {
        self.buf.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> EngineResult<()> {
        self.buf.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> EngineResult<()> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    /// Write a length-prefixed string.
    pub fn write_str(&mut self, s: &str) -> EngineResult<()> {
        self.write_u32(s.len() as u32)?;
        self.write_bytes(s.as_bytes())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for OStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Deflate `data` at `level` (1-9).
pub fn compress(data: &[u8], level: u8) -> EngineResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9) as u32));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn write_type(out: &mut OStream, native: NativeType) -> EngineResult<()> {
    out.write_u8(native.class() as u8)?;
    out.write_u8(native.size() as u8)?;
    out.write_u8(native.is_signed() as u8)
}

fn write_node(out: &mut OStream, image: &Image, id: NodeId) -> EngineResult<()> {
    match image.node(id)? {
        Node::Group(links) => {
            out.write_u8(TAG_GROUP)?;
            out.write_u32(links.len() as u32)?;
            for (name, &child) in links {
                out.write_str(name)?;
                write_node(out, image, child)?;
            }
        }
        Node::Dataset(ds) => {
            out.write_u8(TAG_DATASET)?;
            write_type(out, ds.native)?;
            out.write_u32(ds.dims.rank() as u32)?;
            for &d in ds.dims.sizes() {
                out.write_u64(d as u64)?;
            }
            if ds.deflate > 0 && !ds.data.is_empty() {
                let packed = compress(&ds.data, ds.deflate)?;
                out.write_u8(ds.deflate)?;
                out.write_u64(packed.len() as u64)?;
                out.write_bytes(&packed)?;
            } else {
                out.write_u8(0)?;
                out.write_u64(ds.data.len() as u64)?;
                out.write_bytes(&ds.data)?;
            }
        }
        Node::NamedType(native) => {
            out.write_u8(TAG_NAMED_TYPE)?;
            write_type(out, *native)?;
        }
    }
    Ok(())
}

/// Encode an image into a complete container.
pub fn encode(image: &Image) -> EngineResult<Vec<u8>> {
    let mut body = OStream::new();
    write_node(&mut body, image, Image::ROOT)?;
    let body = body.into_inner();

    let mut out = OStream::new();
    out.write_bytes(MAGIC)?;
    out.write_u8(FLAG_COMPLETE)?;
    out.write_u16(CURRENT_VERSION)?;
    out.write_u64(body.len() as u64)?;
    debug_assert_eq!(out.pos(), HEADER_SIZE as u64);
    out.write_bytes(&body)?;
    Ok(out.into_inner())
}

/// Write an image to `path`, replacing any previous content.
/// Returns the number of bytes written.
pub fn write_file(path: &Path, image: &Image) -> EngineResult<u64> {
    let bytes = encode(image)?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(bytes.len() as u64)
}
