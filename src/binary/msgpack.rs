use crate::error::{Error, FileFormatError};
use crate::source::{read_exact, ByteSource};

/// A pull-based MessagePack decoder over a [`ByteSource`].
///
/// Only the tag bytes BinaryCIF documents actually use are implemented:
/// fixint/int8..64, uint8..64, fixstr/str8/16/32, bin8/16/32, fixmap/map16/32,
/// fixarray/array16/32, float32/64, and nil. Anything else is rejected when
/// read directly, or walked structurally (without being interpreted) by
/// `skip_value`, which needs to understand every tag's shape to size it.
pub(crate) struct MsgpackReader<S> {
    source: S,
}

impl<S: ByteSource> MsgpackReader<S> {
    pub(crate) fn new(source: S) -> Self {
        MsgpackReader { source }
    }

    fn read_tag(&mut self) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        read_exact(&mut self.source, &mut b)?;
        Ok(b[0])
    }

    fn read_u16_be(&mut self) -> Result<u16, Error> {
        let mut b = [0u8; 2];
        read_exact(&mut self.source, &mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    fn read_u32_be(&mut self) -> Result<u32, Error> {
        let mut b = [0u8; 4];
        read_exact(&mut self.source, &mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn read_u64_be(&mut self) -> Result<u64, Error> {
        let mut b = [0u8; 8];
        read_exact(&mut self.source, &mut b)?;
        Ok(u64::from_be_bytes(b))
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; n];
        read_exact(&mut self.source, &mut buf)?;
        Ok(buf)
    }

    fn skip_bytes(&mut self, mut n: usize) -> Result<(), Error> {
        let mut buf = [0u8; 4096];
        while n > 0 {
            let chunk = n.min(buf.len());
            read_exact(&mut self.source, &mut buf[..chunk])?;
            n -= chunk;
        }
        Ok(())
    }

    fn int_from_tag(&mut self, tag: u8) -> Result<i64, Error> {
        match tag {
            0x00..=0x7f => Ok(tag as i64),
            0xe0..=0xff => Ok(tag as i8 as i64),
            0xcc => Ok(self.read_tag()? as i64),
            0xcd => Ok(self.read_u16_be()? as i64),
            0xce => Ok(self.read_u32_be()? as i64),
            0xcf => Ok(self.read_u64_be()? as i64),
            0xd0 => {
                let mut b = [0u8; 1];
                read_exact(&mut self.source, &mut b)?;
                Ok(b[0] as i8 as i64)
            }
            0xd1 => Ok(self.read_u16_be()? as i16 as i64),
            0xd2 => Ok(self.read_u32_be()? as i32 as i64),
            0xd3 => Ok(self.read_u64_be()? as i64),
            _ => Err(FileFormatError::UnexpectedMsgpackTag {
                expected: "an integer",
                tag,
            }
            .into()),
        }
    }

    pub(crate) fn read_int(&mut self) -> Result<i64, Error> {
        let tag = self.read_tag()?;
        self.int_from_tag(tag)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, Error> {
        let tag = self.read_tag()?;
        match tag {
            0xca => Ok(f32::from_bits(self.read_u32_be()?) as f64),
            0xcb => Ok(f64::from_bits(self.read_u64_be()?)),
            _ => Ok(self.int_from_tag(tag)? as f64),
        }
    }

    fn map_len_from_tag(&mut self, tag: u8, expected: &'static str) -> Result<usize, Error> {
        match tag {
            0x80..=0x8f => Ok((tag & 0xf) as usize),
            0xde => Ok(self.read_u16_be()? as usize),
            0xdf => Ok(self.read_u32_be()? as usize),
            _ => Err(FileFormatError::UnexpectedMsgpackTag { expected, tag }.into()),
        }
    }

    pub(crate) fn read_map_len(&mut self) -> Result<usize, Error> {
        let tag = self.read_tag()?;
        self.map_len_from_tag(tag, "a map")
    }

    /// Reads a map header, or `None` if the value is `nil`. Used for the
    /// optional `mask` field, which BinaryCIF writers may omit entirely by
    /// writing `nil` rather than leaving the key out.
    pub(crate) fn read_map_len_or_nil(&mut self) -> Result<Option<usize>, Error> {
        let tag = self.read_tag()?;
        if tag == 0xc0 {
            return Ok(None);
        }
        Ok(Some(self.map_len_from_tag(tag, "a map or nil")?))
    }

    pub(crate) fn read_array_len(&mut self) -> Result<usize, Error> {
        let tag = self.read_tag()?;
        match tag {
            0x90..=0x9f => Ok((tag & 0xf) as usize),
            0xdc => Ok(self.read_u16_be()? as usize),
            0xdd => Ok(self.read_u32_be()? as usize),
            _ => Err(FileFormatError::UnexpectedMsgpackTag {
                expected: "an array",
                tag,
            }
            .into()),
        }
    }

    pub(crate) fn read_str(&mut self) -> Result<Vec<u8>, Error> {
        let tag = self.read_tag()?;
        let len = match tag {
            0xa0..=0xbf => (tag & 0x1f) as usize,
            0xd9 => self.read_tag()? as usize,
            0xda => self.read_u16_be()? as usize,
            0xdb => self.read_u32_be()? as usize,
            _ => {
                return Err(FileFormatError::UnexpectedMsgpackTag {
                    expected: "a string",
                    tag,
                }
                .into())
            }
        };
        self.read_bytes(len)
    }

    pub(crate) fn read_bin(&mut self) -> Result<Vec<u8>, Error> {
        let tag = self.read_tag()?;
        let len = match tag {
            0xc4 => self.read_tag()? as usize,
            0xc5 => self.read_u16_be()? as usize,
            0xc6 => self.read_u32_be()? as usize,
            _ => {
                return Err(FileFormatError::UnexpectedMsgpackTag {
                    expected: "binary data",
                    tag,
                }
                .into())
            }
        };
        self.read_bytes(len)
    }

    /// Reads a string or binary atom, whichever tag is present. `stringData`
    /// in practice is always written as a MessagePack string, but accepting
    /// either keeps this lenient to encoders that choose bin8/16/32 instead.
    pub(crate) fn read_str_or_bin(&mut self) -> Result<Vec<u8>, Error> {
        let tag = self.read_tag()?;
        let len = match tag {
            0xa0..=0xbf => (tag & 0x1f) as usize,
            0xd9 => self.read_tag()? as usize,
            0xda => self.read_u16_be()? as usize,
            0xdb => self.read_u32_be()? as usize,
            0xc4 => self.read_tag()? as usize,
            0xc5 => self.read_u16_be()? as usize,
            0xc6 => self.read_u32_be()? as usize,
            _ => {
                return Err(FileFormatError::UnexpectedMsgpackTag {
                    expected: "a string or binary atom",
                    tag,
                }
                .into())
            }
        };
        self.read_bytes(len)
    }

    /// Reads and discards one complete MessagePack object, recursing into
    /// maps and arrays. Used for keys this crate doesn't recognize.
    pub(crate) fn skip_value(&mut self) -> Result<(), Error> {
        let tag = self.read_tag()?;
        self.skip_after_tag(tag)
    }

    fn skip_after_tag(&mut self, tag: u8) -> Result<(), Error> {
        match tag {
            0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => Ok(()),
            0xca => self.skip_bytes(4),
            0xcb => self.skip_bytes(8),
            0xcc | 0xd0 => self.skip_bytes(1),
            0xcd | 0xd1 => self.skip_bytes(2),
            0xce | 0xd2 => self.skip_bytes(4),
            0xcf | 0xd3 => self.skip_bytes(8),
            0xa0..=0xbf => {
                let len = (tag & 0x1f) as usize;
                self.skip_bytes(len)
            }
            0xd9 | 0xc4 => {
                let len = self.read_tag()? as usize;
                self.skip_bytes(len)
            }
            0xda | 0xc5 => {
                let len = self.read_u16_be()? as usize;
                self.skip_bytes(len)
            }
            0xdb | 0xc6 => {
                let len = self.read_u32_be()? as usize;
                self.skip_bytes(len)
            }
            0x90..=0x9f => self.skip_n_values((tag & 0xf) as usize),
            0xdc => {
                let n = self.read_u16_be()? as usize;
                self.skip_n_values(n)
            }
            0xdd => {
                let n = self.read_u32_be()? as usize;
                self.skip_n_values(n)
            }
            0x80..=0x8f => self.skip_n_pairs((tag & 0xf) as usize),
            0xde => {
                let n = self.read_u16_be()? as usize;
                self.skip_n_pairs(n)
            }
            0xdf => {
                let n = self.read_u32_be()? as usize;
                self.skip_n_pairs(n)
            }
            _ => Err(FileFormatError::UnexpectedMsgpackTag {
                expected: "a recognized msgpack tag",
                tag,
            }
            .into()),
        }
    }

    fn skip_n_values(&mut self, n: usize) -> Result<(), Error> {
        for _ in 0..n {
            self.skip_value()?;
        }
        Ok(())
    }

    fn skip_n_pairs(&mut self, n: usize) -> Result<(), Error> {
        for _ in 0..n {
            self.skip_value()?;
            self.skip_value()?;
        }
        Ok(())
    }
}
