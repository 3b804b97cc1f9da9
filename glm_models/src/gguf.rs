//! GGUF header inspection.
//!
//! Only the header is read: magic, version, metadata and tensor infos. Tensor
//! data is never touched, so summarising a multi-gigabyte file is cheap.
//!
//! Format: https://github.com/ggml-org/ggml/blob/master/docs/gguf.md

use crate::error::{ModelsError, ModelsResult};
use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

const GGUF_MAGIC: u32 = 0x4655_4747; // "GGUF" read as little-endian
const MAX_STRING_LEN: u64 = 64 * 1024 * 1024;
const MAX_DIMENSIONS: u32 = 8;

/// Tensor storage types, by their ggml type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GgmlDtype {
    F32,
    F16,
    BF16,
    Q4_0,
    Q4_1,
    Q5_0,
    Q5_1,
    Q8_0,
    Q8_1,
    Q2K,
    Q3K,
    Q4K,
    Q5K,
    Q6K,
    Q8K,
    Other(u32),
}

impl GgmlDtype {
    pub fn from_u32(u: u32) -> Self {
        match u {
            0 => Self::F32,
            1 => Self::F16,
            2 => Self::Q4_0,
            3 => Self::Q4_1,
            6 => Self::Q5_0,
            7 => Self::Q5_1,
            8 => Self::Q8_0,
            9 => Self::Q8_1,
            10 => Self::Q2K,
            11 => Self::Q3K,
            12 => Self::Q4K,
            13 => Self::Q5K,
            14 => Self::Q6K,
            15 => Self::Q8K,
            30 => Self::BF16,
            other => Self::Other(other),
        }
    }

    pub fn is_full_precision(&self) -> bool {
        matches!(self, Self::F32 | Self::F16 | Self::BF16)
    }
}

impl fmt::Display for GgmlDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Q2K => write!(f, "Q2_K"),
            Self::Q3K => write!(f, "Q3_K"),
            Self::Q4K => write!(f, "Q4_K"),
            Self::Q5K => write!(f, "Q5_K"),
            Self::Q6K => write!(f, "Q6_K"),
            Self::Q8K => write!(f, "Q8_K"),
            Self::Other(id) => write!(f, "type-{id}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// What the exporter and the model loader need to know about a GGUF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GgufSummary {
    pub version: u32,
    pub architecture: Option<String>,
    pub name: Option<String>,
    /// `general.file_type`, llama.cpp's `llama_ftype`.
    pub file_type: Option<u32>,
    pub tensor_count: u64,
    pub tensor_types: BTreeMap<GgmlDtype, u64>,
}

impl GgufSummary {
    pub fn read_path<P: AsRef<Path>>(path: P) -> ModelsResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ModelsError::io("open", path, e))?;
        Self::read(&mut BufReader::new(file)).map_err(|e| match e {
            ModelsError::Gguf(msg) => ModelsError::Gguf(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn read<R: Read>(reader: &mut R) -> ModelsResult<Self> {
        let magic = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        if magic != GGUF_MAGIC {
            return Err(ModelsError::Gguf(format!("bad magic 0x{magic:08x}")));
        }
        let version = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        if !(1..=3).contains(&version) {
            return Err(ModelsError::Gguf(format!("unsupported version {version}")));
        }
        let mut header = HeaderReader { reader, version };

        let tensor_count = header.read_len()?;
        let metadata_kv_count = header.read_len()?;

        let mut architecture = None;
        let mut name = None;
        let mut file_type = None;
        for _ in 0..metadata_kv_count {
            let key = header.read_string()?;
            let value_type = header.read_u32()?;
            match (key.as_str(), value_type) {
                ("general.architecture", TYPE_STRING) => architecture = Some(header.read_string()?),
                ("general.name", TYPE_STRING) => name = Some(header.read_string()?),
                ("general.file_type", TYPE_U32) => file_type = Some(header.read_u32()?),
                ("general.file_type", TYPE_I32) => file_type = Some(header.read_u32()?),
                _ => header.skip_value(value_type)?,
            }
        }

        let mut tensor_types = BTreeMap::new();
        for _ in 0..tensor_count {
            let _name = header.read_string()?;
            let n_dimensions = header.read_u32()?;
            if n_dimensions > MAX_DIMENSIONS {
                return Err(ModelsError::Gguf(format!(
                    "tensor with {n_dimensions} dimensions"
                )));
            }
            for _ in 0..n_dimensions {
                header.read_len()?;
            }
            let dtype = GgmlDtype::from_u32(header.read_u32()?);
            let _offset = header.read_u64()?;
            *tensor_types.entry(dtype).or_insert(0) += 1;
        }

        Ok(Self {
            version,
            architecture,
            name,
            file_type,
            tensor_count,
            tensor_types,
        })
    }

    /// True when every tensor is F32, F16 or BF16.
    pub fn is_full_precision(&self) -> bool {
        self.tensor_count > 0 && self.tensor_types.keys().all(GgmlDtype::is_full_precision)
    }

    /// The type most tensors are stored in.
    pub fn dominant_type(&self) -> Option<GgmlDtype> {
        self.tensor_types
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(dtype, _)| *dtype)
    }
}

impl fmt::Display for GgufSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GGUF v{} {} ({} tensors",
            self.version,
            self.architecture.as_deref().unwrap_or("unknown"),
            self.tensor_count
        )?;
        for (dtype, count) in &self.tensor_types {
            write!(f, ", {count} {dtype}")?;
        }
        write!(f, ")")
    }
}

const TYPE_U8: u32 = 0;
const TYPE_I8: u32 = 1;
const TYPE_U16: u32 = 2;
const TYPE_I16: u32 = 3;
const TYPE_U32: u32 = 4;
const TYPE_I32: u32 = 5;
const TYPE_F32: u32 = 6;
const TYPE_BOOL: u32 = 7;
const TYPE_STRING: u32 = 8;
const TYPE_ARRAY: u32 = 9;
const TYPE_U64: u32 = 10;
const TYPE_I64: u32 = 11;
const TYPE_F64: u32 = 12;

fn truncated(e: std::io::Error) -> ModelsError {
    ModelsError::Gguf(format!("truncated header: {e}"))
}

struct HeaderReader<'a, R> {
    reader: &'a mut R,
    version: u32,
}

impl<R: Read> HeaderReader<'_, R> {
    fn read_u32(&mut self) -> ModelsResult<u32> {
        self.reader.read_u32::<LittleEndian>().map_err(truncated)
    }

    fn read_u64(&mut self) -> ModelsResult<u64> {
        self.reader.read_u64::<LittleEndian>().map_err(truncated)
    }

    /// Counts and lengths are u32 in v1 and u64 from v2 on.
    fn read_len(&mut self) -> ModelsResult<u64> {
        match self.version {
            1 => Ok(self.read_u32()? as u64),
            _ => self.read_u64(),
        }
    }

    fn read_string(&mut self) -> ModelsResult<String> {
        let len = self.read_len()?;
        if len > MAX_STRING_LEN {
            return Err(ModelsError::Gguf(format!("string of {len} bytes")));
        }
        let mut v = vec![0u8; len as usize];
        self.reader.read_exact(&mut v).map_err(truncated)?;
        // Some writers null-terminate anyway.
        while let Some(0) = v.last() {
            v.pop();
        }
        Ok(String::from_utf8_lossy(&v).into_owned())
    }

    fn skip_bytes(&mut self, n: u64) -> ModelsResult<()> {
        let copied = std::io::copy(&mut self.reader.by_ref().take(n), &mut std::io::sink())
            .map_err(truncated)?;
        if copied != n {
            return Err(ModelsError::Gguf("truncated header".to_string()));
        }
        Ok(())
    }

    fn skip_value(&mut self, value_type: u32) -> ModelsResult<()> {
        match value_type {
            TYPE_U8 | TYPE_I8 | TYPE_BOOL => self.skip_bytes(1),
            TYPE_U16 | TYPE_I16 => self.skip_bytes(2),
            TYPE_U32 | TYPE_I32 | TYPE_F32 => self.skip_bytes(4),
            TYPE_U64 | TYPE_I64 | TYPE_F64 => self.skip_bytes(8),
            TYPE_STRING => {
                let len = self.read_len()?;
                self.skip_bytes(len)
            }
            TYPE_ARRAY => {
                let element_type = self.read_u32()?;
                let len = self.read_len()?;
                match fixed_size(element_type) {
                    Some(size) => {
                        let total = size.checked_mul(len).ok_or_else(|| {
                            ModelsError::Gguf(format!("array of {len} elements"))
                        })?;
                        self.skip_bytes(total)
                    }
                    None => {
                        for _ in 0..len {
                            self.skip_value(element_type)?;
                        }
                        Ok(())
                    }
                }
            }
            other => Err(ModelsError::Gguf(format!("unknown metadata value type {other}"))),
        }
    }
}

fn fixed_size(value_type: u32) -> Option<u64> {
    match value_type {
        TYPE_U8 | TYPE_I8 | TYPE_BOOL => Some(1),
        TYPE_U16 | TYPE_I16 => Some(2),
        TYPE_U32 | TYPE_I32 | TYPE_F32 => Some(4),
        TYPE_U64 | TYPE_I64 | TYPE_F64 => Some(8),
        _ => None,
    }
}
