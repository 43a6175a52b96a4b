mod encoding;
mod msgpack;
mod reader;

pub(crate) use reader::BinaryReader;
