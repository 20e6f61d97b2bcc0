//! Container format reader.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use memmap2::Mmap;

use super::format::*;
use super::image::{DatasetNode, Image, Node, NodeId};
use crate::engine::{EngineError, EngineResult};
use crate::util::{NativeType, Shape, TypeClass};

/// Deepest group nesting accepted while decoding.
const MAX_DEPTH: usize = 256;

/// Input stream over a whole container.
/// Backed by a memory map or by a buffer read up front.
pub struct IStream {
    inner: StreamInner,
}

enum StreamInner {
    Mmap(Mmap),
    Buffer(Vec<u8>),
}

impl IStream {
    /// Open a container for reading.
    pub fn open(path: &Path, use_mmap: bool) -> EngineResult<Self> {
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EngineError::FileNotFound(path.to_path_buf())
            } else {
                EngineError::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(EngineError::UnexpectedEof(size));
        }

        let inner = if use_mmap {
            // Safety: the mapping is read-only and dropped before this engine
            // rewrites the file.
            StreamInner::Mmap(unsafe { Mmap::map(&file) }?)
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            StreamInner::Buffer(buf)
        };
        Ok(Self { inner })
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        match &self.inner {
            StreamInner::Mmap(m) => &m[..],
            StreamInner::Buffer(b) => &b[..],
        }
    }
}

/// Parsed header fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub flags: u8,
    pub version: u16,
    pub body_len: u64,
}

pub fn parse_header(data: &[u8]) -> EngineResult<Header> {
    if data.len() < HEADER_SIZE {
        return Err(EngineError::UnexpectedEof(data.len() as u64));
    }
    if !has_magic(data) {
        return Err(EngineError::InvalidMagic);
    }
    let flags = data[FLAGS_OFFSET];
    let version = u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]);
    if version != CURRENT_VERSION {
        return Err(EngineError::UnsupportedVersion(version));
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&data[BODY_LEN_OFFSET..HEADER_SIZE]);
    let body_len = u64::from_le_bytes(len);
    if flags & FLAG_COMPLETE == 0 {
        return Err(EngineError::corrupt("container was not completely written"));
    }
    Ok(Header { flags, version, body_len })
}

/// Byte cursor that reports truncation with its absolute position.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> Cursor<'a> {
    fn eof(&self) -> EngineError {
        EngineError::UnexpectedEof(self.base + self.pos as u64)
    }

    fn take(&mut self, n: usize) -> EngineResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len());
        let Some(end) = end else {
            return Err(self.eof());
        };
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn read_u8(&mut self) -> EngineResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> EngineResult<u32> {
        let mut bytes = self.take(4)?;
        Ok(bytes.read_u32::<LittleEndian>()?)
    }

    fn read_u64(&mut self) -> EngineResult<u64> {
        let mut bytes = self.take(8)?;
        Ok(bytes.read_u64::<LittleEndian>()?)
    }

    fn read_len(&mut self) -> EngineResult<usize> {
        let v = self.read_u64()?;
        usize::try_from(v).map_err(|_| EngineError::corrupt(format!("length {} too large", v)))
    }

    fn read_string(&mut self) -> EngineResult<String> {
        let len = self.read_u32()? as usize;
        Ok(String::from_utf8(self.take(len)?.to_vec())?)
    }

    fn read_type(&mut self) -> EngineResult<NativeType> {
        let code = self.read_u8()?;
        let size = self.read_u8()?;
        let signed = self.read_u8()? != 0;
        let class = TypeClass::from_u8(code)
            .ok_or_else(|| EngineError::corrupt(format!("unknown type class {}", code)))?;
        NativeType::from_parts(class, size as usize, signed)
            .ok_or_else(|| EngineError::corrupt(format!("unsupported {} type of size {}", class, size)))
    }
}

/// Inflate a deflated payload and check its length.
///
/// `expected` comes from the file, so it only bounds the read; the buffer
/// grows with what actually inflates.
pub fn decompress(data: &[u8], expected: usize) -> EngineResult<Vec<u8>> {
    let limit = (expected as u64).saturating_add(1);
    let mut out = Vec::with_capacity(expected.min(data.len().saturating_mul(4)));
    ZlibDecoder::new(data).take(limit).read_to_end(&mut out)?;
    if out.len() != expected {
        return Err(EngineError::corrupt(format!(
            "inflated payload is {} bytes, expected {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}

fn read_node(cur: &mut Cursor<'_>, image: &mut Image, depth: usize) -> EngineResult<NodeId> {
    if depth > MAX_DEPTH {
        return Err(EngineError::corrupt("groups nested too deeply"));
    }
    match cur.read_u8()? {
        TAG_GROUP => {
            let id = image.push(Node::empty_group());
            let count = cur.read_u32()?;
            let mut links = BTreeMap::new();
            for _ in 0..count {
                let name = cur.read_string()?;
                let child = read_node(cur, image, depth + 1)?;
                if links.insert(name.clone(), child).is_some() {
                    return Err(EngineError::corrupt(format!("duplicate link {:?}", name)));
                }
            }
            image.set(id, Node::Group(links));
            Ok(id)
        }
        TAG_DATASET => {
            let native = cur.read_type()?;
            let rank = cur.read_u32()?;
            if rank > MAX_RANK {
                return Err(EngineError::corrupt(format!("rank {} too large", rank)));
            }
            let mut dims = Vec::with_capacity(rank as usize);
            for _ in 0..rank {
                dims.push(cur.read_len()?);
            }
            let dims = Shape::from(dims);
            let expected = dims
                .sizes()
                .iter()
                .try_fold(native.size(), |acc, &d| acc.checked_mul(d))
                .ok_or_else(|| EngineError::corrupt("dataset size overflows"))?;

            let deflate = cur.read_u8()?;
            let len = cur.read_len()?;
            let payload = cur.take(len)?;
            let data = if deflate > 0 {
                decompress(payload, expected)?
            } else if payload.len() == expected {
                payload.to_vec()
            } else {
                return Err(EngineError::corrupt(format!(
                    "dataset payload is {} bytes, expected {}",
                    payload.len(),
                    expected
                )));
            };
            Ok(image.push(Node::Dataset(DatasetNode { native, dims, deflate, data })))
        }
        TAG_NAMED_TYPE => {
            let native = cur.read_type()?;
            Ok(image.push(Node::NamedType(native)))
        }
        tag => Err(EngineError::corrupt(format!("unknown node tag {}", tag))),
    }
}

/// Decode a complete container.
pub fn decode(data: &[u8]) -> EngineResult<Image> {
    let header = parse_header(data)?;
    let body_len = usize::try_from(header.body_len)
        .map_err(|_| EngineError::corrupt("body length too large"))?;
    let end = HEADER_SIZE
        .checked_add(body_len)
        .filter(|&e| e <= data.len())
        .ok_or(EngineError::UnexpectedEof(data.len() as u64))?;

    let mut cur = Cursor { data: &data[HEADER_SIZE..end], pos: 0, base: HEADER_SIZE as u64 };
    let mut image = Image::empty();
    let root = read_node(&mut cur, &mut image, 0)?;
    if root != Image::ROOT || !matches!(image.node(root)?, Node::Group(_)) {
        return Err(EngineError::corrupt("root node is not a group"));
    }
    if cur.pos != body_len {
        return Err(EngineError::corrupt("trailing bytes after root group"));
    }
    Ok(image)
}

/// Read and decode the container at `path`.
pub fn read_file(path: &Path, use_mmap: bool) -> EngineResult<Image> {
    let stream = IStream::open(path, use_mmap)?;
    decode(stream.data())
}

/// Whether `path` starts with a container header. Missing or short files
/// are not containers.
pub fn is_container(path: &Path) -> EngineResult<bool> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let mut header = [0u8; HEADER_SIZE];
    match file.read_exact(&mut header) {
        Ok(()) => Ok(parse_header(&header).is_ok()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mem::writer::encode;

    fn sample() -> Image {
        let mut img = Image::new();
        let g = img.insert(Image::ROOT, "grp", Node::empty_group()).unwrap();
        let mut ds = DatasetNode::new(NativeType::Int32, Shape::from([2, 3]), 0);
        ds.data = bytemuck::cast_slice(&[1i32, 2, 3, 4, 5, 6]).to_vec();
        img.insert(g, "raw", Node::Dataset(ds)).unwrap();
        let mut packed = DatasetNode::new(NativeType::Float64, Shape::from(64), 6);
        packed.data = bytemuck::cast_slice(&[0.5f64; 64]).to_vec();
        img.insert(Image::ROOT, "packed", Node::Dataset(packed)).unwrap();
        img.insert(Image::ROOT, "t", Node::NamedType(NativeType::Uint16)).unwrap();
        img
    }

    #[test]
    fn test_encode_decode() {
        let img = sample();
        let bytes = encode(&img).unwrap();
        assert_eq!(&bytes[..5], MAGIC);

        let back = decode(&bytes).unwrap();
        let raw = back.resolve(Image::ROOT, "/grp/raw").unwrap();
        let ds = back.dataset(raw).unwrap();
        assert_eq!(ds.dims.sizes(), &[2, 3]);
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, i32>(&ds.data), vec![1, 2, 3, 4, 5, 6]);

        let packed = back.resolve(Image::ROOT, "packed").unwrap();
        assert_eq!(back.dataset(packed).unwrap().deflate, 6);
        assert_eq!(back.dataset(packed).unwrap().data.len(), 64 * 8);

        let t = back.resolve(Image::ROOT, "t").unwrap();
        assert_eq!(back.node(t).unwrap(), &Node::NamedType(NativeType::Uint16));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&Image::new()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(EngineError::InvalidMagic)));
    }

    #[test]
    fn test_truncated_body() {
        let bytes = encode(&sample()).unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(decode(cut), Err(EngineError::UnexpectedEof(_))));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_deflated_dataset() {
        let mut img = Image::new();
        let mut ds = DatasetNode::new(NativeType::Int64, Shape::from(4), 6);
        ds.data = bytemuck::cast_slice(&[7i64; 4]).to_vec();
        img.insert(Image::ROOT, "d", Node::Dataset(ds)).unwrap();
        let mut bytes = encode(&img).unwrap();

        // header, group tag and count, link "d", dataset tag, type, rank
        let dim = HEADER_SIZE + 1 + 4 + 4 + 1 + 1 + 3 + 4;
        assert_eq!(&bytes[dim..dim + 8], &4u64.to_le_bytes());
        bytes[dim..dim + 8].copy_from_slice(&(1u64 << 60).to_le_bytes());

        assert!(matches!(decode(&bytes), Err(EngineError::InvalidStructure(_))));
    }

    #[test]
    fn test_short_inflated_payload() {
        let packed = crate::engine::mem::writer::compress(&[1u8; 10], 6).unwrap();
        assert!(decompress(&packed, 10).is_ok());
        assert!(matches!(decompress(&packed, 11), Err(EngineError::InvalidStructure(_))));
        assert!(matches!(decompress(&packed, 9), Err(EngineError::InvalidStructure(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode(&Image::new()).unwrap();
        bytes[VERSION_OFFSET] = 9;
        assert!(matches!(decode(&bytes), Err(EngineError::UnsupportedVersion(9))));
    }
}
