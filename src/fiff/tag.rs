use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array2;
use std::io::{self, Read, Write};

use super::constants::*;
use super::FiffError;

const TAG_HEADER_LEN: u64 = 16;
// anything bigger than this is a corrupt size field, not a real tag
const MAX_TAG_SIZE: i32 = i32::MAX - 16;

/// A single tag: header fields plus raw big-endian payload bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub kind: i32,
    pub ty: i32,
    pub data: Vec<u8>,
}

impl Tag {
    pub fn new(kind: i32, ty: i32, data: Vec<u8>) -> Self {
        Tag { kind, ty, data }
    }

    /// Reads the next tag, or `None` when the stream ends cleanly between tags.
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>, FiffError> {
        let mut first = [0u8; 1];
        loop {
            match reader.read(&mut first) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let mut buf = [0u8; 16];
        buf[0] = first[0];
        reader.read_exact(&mut buf[1..]).map_err(truncated)?;
        let mut header = &buf[..];

        let kind = header.read_i32::<BigEndian>()?;
        let ty = header.read_i32::<BigEndian>()?;
        let size = header.read_i32::<BigEndian>()?;
        let _next = header.read_i32::<BigEndian>()?;
        if !(0..=MAX_TAG_SIZE).contains(&size) {
            return Err(FiffError::Malformed(format!(
                "tag {} has invalid size {}",
                kind, size
            )));
        }

        // grow with the stream instead of trusting the declared size
        let mut data = Vec::new();
        reader.by_ref().take(size as u64).read_to_end(&mut data)?;
        if data.len() != size as usize {
            return Err(truncated(io::ErrorKind::UnexpectedEof.into()));
        }
        Ok(Some(Tag { kind, ty, data }))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i32::<BigEndian>(self.kind)?;
        writer.write_i32::<BigEndian>(self.ty)?;
        writer.write_i32::<BigEndian>(self.data.len() as i32)?;
        writer.write_i32::<BigEndian>(FIFFV_NEXT_SEQ)?;
        writer.write_all(&self.data)
    }

    /// Bytes this tag occupies in an uncompressed stream.
    pub fn encoded_len(&self) -> u64 {
        TAG_HEADER_LEN + self.data.len() as u64
    }

    pub fn block_start(block: i32) -> Self {
        Tag::int(FIFF_BLOCK_START, block)
    }

    pub fn block_end(block: i32) -> Self {
        Tag::int(FIFF_BLOCK_END, block)
    }

    pub fn int(kind: i32, value: i32) -> Self {
        Tag::ints(kind, &[value])
    }

    pub fn ints(kind: i32, values: &[i32]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 4);
        for v in values {
            data.extend_from_slice(&v.to_be_bytes());
        }
        Tag::new(kind, FIFFT_INT, data)
    }

    pub fn double(kind: i32, value: f64) -> Self {
        Tag::doubles(kind, &[value])
    }

    pub fn doubles(kind: i32, values: &[f64]) -> Self {
        let mut data = Vec::with_capacity(values.len() * 8);
        for v in values {
            data.extend_from_slice(&v.to_be_bytes());
        }
        Tag::new(kind, FIFFT_DOUBLE, data)
    }

    pub fn floats(kind: i32, values: impl IntoIterator<Item = f32>) -> Self {
        let mut data = Vec::new();
        for v in values {
            data.extend_from_slice(&v.to_be_bytes());
        }
        Tag::new(kind, FIFFT_FLOAT, data)
    }

    pub fn string(kind: i32, value: &str) -> Self {
        Tag::new(kind, FIFFT_STRING, value.as_bytes().to_vec())
    }

    /// Channel record: channel kind followed by the UTF-8 name.
    pub fn ch_info(kind_code: i32, name: &str) -> Self {
        let mut data = Vec::with_capacity(4 + name.len());
        data.extend_from_slice(&kind_code.to_be_bytes());
        data.extend_from_slice(name.as_bytes());
        Tag::new(FIFF_CH_INFO, FIFFT_CH_INFO_STRUCT, data)
    }

    /// Row-major values, then the dimensions, then the dimension count.
    pub fn double_matrix(kind: i32, matrix: &Array2<f64>) -> Self {
        let (rows, cols) = matrix.dim();
        let mut data = Vec::with_capacity(rows * cols * 8 + 12);
        for v in matrix.iter() {
            data.extend_from_slice(&v.to_be_bytes());
        }
        for dim in [rows as i32, cols as i32, 2] {
            data.extend_from_slice(&dim.to_be_bytes());
        }
        Tag::new(kind, FIFFT_MATRIX | FIFFT_DOUBLE, data)
    }

    pub fn as_i32s(&self) -> Result<Vec<i32>, FiffError> {
        self.expect_type(FIFFT_INT)?;
        Ok(self.chunks::<4>()?.map(i32::from_be_bytes).collect())
    }

    pub fn as_i32(&self) -> Result<i32, FiffError> {
        self.as_i32s()?
            .first()
            .copied()
            .ok_or_else(|| self.malformed("empty int tag"))
    }

    pub fn as_f64s(&self) -> Result<Vec<f64>, FiffError> {
        self.expect_type(FIFFT_DOUBLE)?;
        Ok(self.chunks::<8>()?.map(f64::from_be_bytes).collect())
    }

    pub fn as_f64(&self) -> Result<f64, FiffError> {
        self.as_f64s()?
            .first()
            .copied()
            .ok_or_else(|| self.malformed("empty double tag"))
    }

    pub fn as_f32s(&self) -> Result<Vec<f32>, FiffError> {
        self.expect_type(FIFFT_FLOAT)?;
        Ok(self.chunks::<4>()?.map(f32::from_be_bytes).collect())
    }

    pub fn as_str(&self) -> Result<&str, FiffError> {
        self.expect_type(FIFFT_STRING)?;
        std::str::from_utf8(&self.data).map_err(|_| self.malformed("string is not valid UTF-8"))
    }

    pub fn as_ch_info(&self) -> Result<(i32, String), FiffError> {
        self.expect_type(FIFFT_CH_INFO_STRUCT)?;
        if self.data.len() < 4 {
            return Err(self.malformed("channel record too short"));
        }
        let mut head = &self.data[..4];
        let kind_code = head.read_i32::<BigEndian>()?;
        let name = std::str::from_utf8(&self.data[4..])
            .map_err(|_| self.malformed("channel name is not valid UTF-8"))?;
        Ok((kind_code, name.to_string()))
    }

    pub fn as_double_matrix(&self) -> Result<Array2<f64>, FiffError> {
        self.expect_type(FIFFT_MATRIX | FIFFT_DOUBLE)?;
        if self.data.len() < 12 {
            return Err(self.malformed("matrix tag too short"));
        }
        let (values, dims) = self.data.split_at(self.data.len() - 12);
        let mut dims = dims;
        let rows = dims.read_i32::<BigEndian>()?;
        let cols = dims.read_i32::<BigEndian>()?;
        let ndim = dims.read_i32::<BigEndian>()?;
        if ndim != 2 || rows < 0 || cols < 0 {
            return Err(self.malformed("unsupported matrix dimensions"));
        }
        let (rows, cols) = (rows as usize, cols as usize);
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(8))
            .ok_or_else(|| self.malformed("matrix dimensions overflow"))?;
        if values.len() != expected {
            return Err(self.malformed("matrix size does not match its dimensions"));
        }
        let flat = values.chunks_exact(8).map(|c| f64::from_be_bytes(array(c))).collect();
        Array2::from_shape_vec((rows, cols), flat).map_err(|e| self.malformed(&e.to_string()))
    }

    fn chunks<const N: usize>(
        &self,
    ) -> Result<impl Iterator<Item = [u8; N]> + '_, FiffError> {
        if self.data.len() % N != 0 {
            return Err(self.malformed("payload length is not a multiple of the item size"));
        }
        Ok(self.data.chunks_exact(N).map(array::<N>))
    }

    fn expect_type(&self, ty: i32) -> Result<(), FiffError> {
        if self.ty != ty {
            return Err(FiffError::Malformed(format!(
                "tag {} has type {:#x}, expected {:#x}",
                self.kind, self.ty, ty
            )));
        }
        Ok(())
    }

    fn malformed(&self, what: &str) -> FiffError {
        FiffError::Malformed(format!("tag {}: {}", self.kind, what))
    }
}

fn array<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

fn truncated(e: io::Error) -> FiffError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        FiffError::Malformed("file is truncated in the middle of a tag".to_string())
    } else {
        e.into()
    }
}
