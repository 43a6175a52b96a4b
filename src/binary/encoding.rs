use crate::error::{Error, FileFormatError};

/// One stage of a column's encoding chain. `StringArray` is special: real
/// BinaryCIF writers only ever use it as the sole, top-level encoding for a
/// string column, carrying its own embedded sub-pipelines for indices and
/// offsets rather than consuming the output of a prior stage.
pub(crate) enum Encoding {
    ByteArray { element_type: i64 },
    IntegerPacking,
    Delta { origin: i32 },
    RunLength,
    FixedPoint { factor: f64 },
    StringArray {
        data_encoding: Vec<Encoding>,
        offset_encoding: Vec<Encoding>,
        string_data: Vec<u8>,
        offsets_raw: Vec<u8>,
    },
}

/// A column's data at one point in its decoding pipeline. The pipeline
/// rewrites this tag as each stage is applied; only `I32`, `F64`, and
/// `Strings` are valid final results (`§4.7`).
pub(crate) enum TypedBuffer {
    Raw(Vec<u8>),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Strings { blob: Vec<u8>, ranges: Vec<(u32, u32)> },
}

pub(crate) enum ColumnValue<'a> {
    Int(i32),
    Float(f64),
    Str(&'a [u8]),
}

impl TypedBuffer {
    pub(crate) fn len(&self) -> usize {
        match self {
            TypedBuffer::Raw(v) => v.len(),
            TypedBuffer::I8(v) => v.len(),
            TypedBuffer::U8(v) => v.len(),
            TypedBuffer::I16(v) => v.len(),
            TypedBuffer::U16(v) => v.len(),
            TypedBuffer::I32(v) => v.len(),
            TypedBuffer::U32(v) => v.len(),
            TypedBuffer::F32(v) => v.len(),
            TypedBuffer::F64(v) => v.len(),
            TypedBuffer::Strings { ranges, .. } => ranges.len(),
        }
    }

    pub(crate) fn get(&self, i: usize) -> Result<ColumnValue<'_>, Error> {
        match self {
            TypedBuffer::I32(v) => Ok(ColumnValue::Int(v[i])),
            TypedBuffer::F64(v) => Ok(ColumnValue::Float(v[i])),
            TypedBuffer::Strings { blob, ranges } => {
                let (start, end) = ranges[i];
                Ok(ColumnValue::Str(&blob[start as usize..end as usize]))
            }
            _ => Err(FileFormatError::UnsupportedColumnType {
                found: "a column whose final encoding stage is not i32, f64, or a string",
            }
            .into()),
        }
    }
}

/// Narrows a mask stream to `u8`. Most writers emit masks as `ByteArray(u8)`
/// directly, but a mask that went through further encoding stages (e.g.
/// `Delta`) ends up `i32`; `§4.6` calls for narrowing that case.
pub(crate) fn as_u8_mask(buf: TypedBuffer) -> Result<Vec<u8>, Error> {
    match buf {
        TypedBuffer::U8(v) => Ok(v),
        TypedBuffer::I32(v) => Ok(v.into_iter().map(|x| x as u8).collect()),
        _ => Err(FileFormatError::BadNumericInput("mask").into()),
    }
}

fn as_i32(buf: TypedBuffer, context: &'static str) -> Result<Vec<i32>, Error> {
    match buf {
        TypedBuffer::I32(v) => Ok(v),
        _ => Err(FileFormatError::BadNumericInput(context).into()),
    }
}

/// Decodes a column's raw bytes through its full encoding chain.
pub(crate) fn decode_column(raw: Vec<u8>, encodings: &[Encoding]) -> Result<TypedBuffer, Error> {
    if let Some(Encoding::StringArray {
        data_encoding,
        offset_encoding,
        string_data,
        offsets_raw,
    }) = encodings.first()
    {
        let indices = as_i32(decode_column(raw, data_encoding)?, "StringArray indices")?;
        let offsets = as_i32(
            decode_column(offsets_raw.clone(), offset_encoding)?,
            "StringArray offsets",
        )?;
        let count = offsets.len().saturating_sub(1);
        let mut ranges = Vec::with_capacity(indices.len());
        for &idx in &indices {
            if idx < 0 || idx as usize >= count {
                return Err(FileFormatError::StringIndexOutOfBounds { index: idx, count }.into());
            }
            let start = offsets[idx as usize];
            let end = offsets[idx as usize + 1];
            if start < 0 || end < start || end as usize > string_data.len() {
                return Err(FileFormatError::StringOffsetOutOfBounds {
                    offset: end,
                    len: string_data.len(),
                }
                .into());
            }
            ranges.push((start as u32, end as u32));
        }
        return Ok(TypedBuffer::Strings {
            blob: string_data.clone(),
            ranges,
        });
    }

    let mut buf = TypedBuffer::Raw(raw);
    for enc in encodings {
        buf = apply_stage(buf, enc)?;
    }
    Ok(buf)
}

fn apply_stage(buf: TypedBuffer, enc: &Encoding) -> Result<TypedBuffer, Error> {
    match enc {
        Encoding::ByteArray { element_type } => decode_byte_array(buf, *element_type),
        Encoding::IntegerPacking => decode_integer_packing(buf),
        Encoding::Delta { origin } => decode_delta(buf, *origin),
        Encoding::RunLength => decode_run_length(buf),
        Encoding::FixedPoint { factor } => decode_fixed_point(buf, *factor),
        Encoding::StringArray { .. } => Err(FileFormatError::UnknownEncodingKind(
            "StringArray is only valid as a column's sole encoding".into(),
        )
        .into()),
    }
}

fn decode_byte_array(buf: TypedBuffer, element_type: i64) -> Result<TypedBuffer, Error> {
    let TypedBuffer::Raw(raw) = buf else {
        return Err(FileFormatError::UnsupportedColumnType {
            found: "ByteArray applied to already-decoded input",
        }
        .into());
    };
    let size: usize = match element_type {
        1 | 4 => 1,
        2 | 5 => 2,
        3 | 6 | 32 => 4,
        33 => 8,
        _ => return Err(FileFormatError::UnsupportedByteArrayType(element_type).into()),
    };
    if raw.len() % size != 0 {
        return Err(FileFormatError::ByteArrayLengthMismatch {
            len: raw.len(),
            size,
        }
        .into());
    }
    Ok(match element_type {
        1 => TypedBuffer::I8(raw.iter().map(|&b| b as i8).collect()),
        4 => TypedBuffer::U8(raw),
        2 => TypedBuffer::I16(
            raw.chunks_exact(2)
                .map(|c| i16::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        5 => TypedBuffer::U16(
            raw.chunks_exact(2)
                .map(|c| u16::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        3 => TypedBuffer::I32(
            raw.chunks_exact(4)
                .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        6 => TypedBuffer::U32(
            raw.chunks_exact(4)
                .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        32 => TypedBuffer::F32(
            raw.chunks_exact(4)
                .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        33 => TypedBuffer::F64(
            raw.chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        _ => unreachable!("checked by the match above"),
    })
}

fn pack<T: Copy + PartialEq + Into<i64>>(input: &[T], is_continuation: impl Fn(T) -> bool) -> Vec<i32> {
    let mut out = Vec::new();
    let mut sum: i64 = 0;
    for &v in input {
        let iv: i64 = v.into();
        if is_continuation(v) {
            sum += iv;
        } else {
            out.push((sum + iv) as i32);
            sum = 0;
        }
    }
    out
}

fn decode_integer_packing(buf: TypedBuffer) -> Result<TypedBuffer, Error> {
    let out = match buf {
        TypedBuffer::I8(v) => pack(&v, |x| x == i8::MAX || x == i8::MIN),
        TypedBuffer::U8(v) => pack(&v, |x| x == u8::MAX),
        TypedBuffer::I16(v) => pack(&v, |x| x == i16::MAX || x == i16::MIN),
        TypedBuffer::U16(v) => pack(&v, |x| x == u16::MAX),
        _ => return Err(FileFormatError::BadIntegerPackingInput.into()),
    };
    Ok(TypedBuffer::I32(out))
}

fn decode_delta(buf: TypedBuffer, origin: i32) -> Result<TypedBuffer, Error> {
    let mut v = as_i32(buf, "Delta")?;
    let mut sum: i64 = origin as i64;
    for x in v.iter_mut() {
        sum += *x as i64;
        *x = sum as i32;
    }
    Ok(TypedBuffer::I32(v))
}

fn decode_run_length(buf: TypedBuffer) -> Result<TypedBuffer, Error> {
    let v = as_i32(buf, "RunLength")?;
    if v.len() % 2 != 0 {
        return Err(FileFormatError::OddRunLengthInput(v.len()).into());
    }
    let mut out = Vec::new();
    for pair in v.chunks_exact(2) {
        let (value, count) = (pair[0], pair[1]);
        if count < 0 {
            return Err(FileFormatError::NegativeRunLengthCount(count).into());
        }
        out.extend(std::iter::repeat(value).take(count as usize));
    }
    Ok(TypedBuffer::I32(out))
}

fn decode_fixed_point(buf: TypedBuffer, factor: f64) -> Result<TypedBuffer, Error> {
    let v = as_i32(buf, "FixedPoint")?;
    Ok(TypedBuffer::F64(v.into_iter().map(|x| x as f64 / factor).collect()))
}
