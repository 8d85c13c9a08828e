//! Key/value dictionaries exchanged with the companion app
//!
//! Wire layout: a tuple count byte followed by that many tuples of
//! `key: u32 LE`, `type: u8`, `length: u16 LE` and `length` value bytes.
//! Integers are 1, 2 or 4 bytes little endian. C strings carry a trailing NUL.

/// Inbound: current temperature, signed integer
pub const KEY_TEMPERATURE: u32 = 0;
/// Inbound: weather conditions, C string
pub const KEY_CONDITIONS: u32 = 1;
/// Outbound: ask the phone for fresh weather
pub const KEY_REQUEST_WEATHER: u32 = 0;

/// Largest payload the inbox accepts
pub const INBOX_SIZE: usize = 128;
/// Largest payload the outbox sends
pub const OUTBOX_SIZE: usize = 16;

const TUPLE_HEADER_LEN: usize = 7;

/// Result codes of the message channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppMessageResult {
    /// The phone is not connected
    NotConnected,
    /// A previous message is still in flight
    Busy,
    /// The payload does not fit the channel
    BufferOverflow,
    /// The payload is not a valid dictionary
    Malformed,
    /// The phone did not acknowledge in time
    SendTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DictError {
    /// Payload ends inside a tuple
    Truncated,
    /// Bytes left over after the last tuple
    TrailingBytes,
    UnknownType(u8),
    /// Integer tuple that is not 1, 2 or 4 bytes long
    InvalidLength,
    /// C string that is not UTF-8
    InvalidUtf8,
    /// Writer ran out of space
    BufferFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum TupleType {
    ByteArray = 0,
    CString = 1,
    UInt = 2,
    Int = 3,
}

impl TryFrom<u8> for TupleType {
    type Error = DictError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TupleType::ByteArray),
            1 => Ok(TupleType::CString),
            2 => Ok(TupleType::UInt),
            3 => Ok(TupleType::Int),
            other => Err(DictError::UnknownType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Bytes(&'a [u8]),
    CString(&'a str),
    UInt(u32),
    Int(i32),
}

impl<'a> Value<'a> {
    /// Integer value, if it is one and fits an `i32`
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(value) => Some(value),
            Value::UInt(value) => i32::try_from(value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Value::CString(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuple<'a> {
    pub key: u32,
    pub value: Value<'a>,
}

/// A validated dictionary borrowing the received bytes
#[derive(Debug, Clone, Copy)]
pub struct Dictionary<'a> {
    count: u8,
    tuples: &'a [u8],
}

impl<'a> Dictionary<'a> {
    /// Check the whole payload and wrap it.
    pub fn parse(data: &'a [u8]) -> Result<Self, DictError> {
        let (&count, tuples) = data.split_first().ok_or(DictError::Truncated)?;
        let dictionary = Self { count, tuples };

        let mut rest = tuples;
        for _ in 0..count {
            let (_, tail) = read_tuple(rest)?;
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(DictError::TrailingBytes);
        }
        Ok(dictionary)
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn iter(&self) -> Tuples<'a> {
        Tuples {
            remaining: self.count,
            data: self.tuples,
        }
    }

    /// First tuple with the given key
    pub fn find(&self, key: u32) -> Option<Tuple<'a>> {
        self.iter().find(|tuple| tuple.key == key)
    }
}

/// Iterator over the tuples of a [`Dictionary`]
pub struct Tuples<'a> {
    remaining: u8,
    data: &'a [u8],
}

impl<'a> Iterator for Tuples<'a> {
    type Item = Tuple<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        // Already validated by `Dictionary::parse`
        let (tuple, rest) = read_tuple(self.data).ok()?;
        self.data = rest;
        Some(tuple)
    }
}

fn read_tuple(data: &[u8]) -> Result<(Tuple<'_>, &[u8]), DictError> {
    if data.len() < TUPLE_HEADER_LEN {
        return Err(DictError::Truncated);
    }
    let key = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    let kind = TupleType::try_from(data[4])?;
    let length = u16::from_le_bytes([data[5], data[6]]) as usize;
    let body = &data[TUPLE_HEADER_LEN..];
    if body.len() < length {
        return Err(DictError::Truncated);
    }
    let (raw, rest) = body.split_at(length);

    let value = match kind {
        TupleType::ByteArray => Value::Bytes(raw),
        TupleType::CString => {
            let text = match raw.iter().position(|&b| b == 0) {
                Some(end) => &raw[..end],
                None => raw,
            };
            Value::CString(core::str::from_utf8(text).map_err(|_| DictError::InvalidUtf8)?)
        }
        TupleType::UInt => Value::UInt(match *raw {
            [a] => u32::from(a),
            [a, b] => u32::from(u16::from_le_bytes([a, b])),
            [a, b, c, d] => u32::from_le_bytes([a, b, c, d]),
            _ => return Err(DictError::InvalidLength),
        }),
        TupleType::Int => Value::Int(match *raw {
            [a] => i32::from(a as i8),
            [a, b] => i32::from(i16::from_le_bytes([a, b])),
            [a, b, c, d] => i32::from_le_bytes([a, b, c, d]),
            _ => return Err(DictError::InvalidLength),
        }),
    };

    Ok((Tuple { key, value }, rest))
}

/// Serialises tuples into a caller provided buffer
pub struct DictionaryWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> DictionaryWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Result<Self, DictError> {
        let first = buf.first_mut().ok_or(DictError::BufferFull)?;
        *first = 0;
        Ok(Self { buf, len: 1 })
    }

    pub fn write_u8(&mut self, key: u32, value: u8) -> Result<(), DictError> {
        self.write(key, TupleType::UInt, &[value])
    }

    pub fn write_int(&mut self, key: u32, value: i32) -> Result<(), DictError> {
        self.write(key, TupleType::Int, &value.to_le_bytes())
    }

    pub fn write_cstring(&mut self, key: u32, value: &str) -> Result<(), DictError> {
        let length = value.len() + 1;
        self.header(key, TupleType::CString, length)?;
        self.buf[self.len..self.len + value.len()].copy_from_slice(value.as_bytes());
        self.buf[self.len + value.len()] = 0;
        self.len += length;
        Ok(())
    }

    /// The encoded dictionary
    pub fn finish(self) -> &'a [u8] {
        &self.buf[..self.len]
    }

    fn write(&mut self, key: u32, kind: TupleType, value: &[u8]) -> Result<(), DictError> {
        self.header(key, kind, value.len())?;
        self.buf[self.len..self.len + value.len()].copy_from_slice(value);
        self.len += value.len();
        Ok(())
    }

    /// Reserve room for a tuple of `length` value bytes and write its header.
    fn header(&mut self, key: u32, kind: TupleType, length: usize) -> Result<(), DictError> {
        let length16 = u16::try_from(length).map_err(|_| DictError::BufferFull)?;
        if self.buf[0] == u8::MAX || self.len + TUPLE_HEADER_LEN + length > self.buf.len() {
            return Err(DictError::BufferFull);
        }
        let header = &mut self.buf[self.len..self.len + TUPLE_HEADER_LEN];
        header[..4].copy_from_slice(&key.to_le_bytes());
        header[4] = kind as u8;
        header[5..].copy_from_slice(&length16.to_le_bytes());
        self.len += TUPLE_HEADER_LEN;
        self.buf[0] += 1;
        Ok(())
    }
}

/// Outbound weather request: `{0: u8 0}`
pub fn weather_request(buf: &mut [u8]) -> Result<&[u8], DictError> {
    let mut writer = DictionaryWriter::new(buf)?;
    writer.write_u8(KEY_REQUEST_WEATHER, 0)?;
    Ok(writer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather(temperature: i32, conditions: &str) -> ([u8; INBOX_SIZE], usize) {
        let mut buf = [0u8; INBOX_SIZE];
        let mut writer = DictionaryWriter::new(&mut buf).unwrap();
        writer.write_cstring(KEY_CONDITIONS, conditions).unwrap();
        writer.write_int(KEY_TEMPERATURE, temperature).unwrap();
        let len = writer.finish().len();
        (buf, len)
    }

    #[test]
    fn weather_request_layout() {
        let mut buf = [0u8; OUTBOX_SIZE];
        let payload = weather_request(&mut buf).unwrap();
        assert_eq!(payload, &[1, 0, 0, 0, 0, 2, 1, 0, 0]);

        let dictionary = Dictionary::parse(payload).unwrap();
        assert_eq!(
            dictionary.find(KEY_REQUEST_WEATHER).unwrap().value,
            Value::UInt(0)
        );
    }

    #[test]
    fn finds_keys_in_any_order() {
        let (buf, len) = weather(21, "Cloudy");
        let dictionary = Dictionary::parse(&buf[..len]).unwrap();

        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.find(KEY_TEMPERATURE).unwrap().value.as_i32(), Some(21));
        assert_eq!(dictionary.find(KEY_CONDITIONS).unwrap().value.as_str(), Some("Cloudy"));
        assert!(dictionary.find(7).is_none());
    }

    #[test]
    fn narrow_integers_are_sign_extended() {
        let data = [
            2, //
            0, 0, 0, 0, 3, 1, 0, 0xfb, //
            5, 0, 0, 0, 3, 2, 0, 0x18, 0xfc,
        ];
        let dictionary = Dictionary::parse(&data).unwrap();
        assert_eq!(dictionary.find(0).unwrap().value, Value::Int(-5));
        assert_eq!(dictionary.find(5).unwrap().value, Value::Int(-1000));
    }

    #[test]
    fn unsigned_temperature_is_accepted_when_it_fits() {
        assert_eq!(Value::UInt(30).as_i32(), Some(30));
        assert_eq!(Value::UInt(u32::MAX).as_i32(), None);
        assert_eq!(Value::CString("30").as_i32(), None);
    }

    #[test]
    fn string_without_terminator_is_read_to_the_end() {
        let data = [1, 1, 0, 0, 0, 1, 3, 0, b'F', b'o', b'g'];
        let dictionary = Dictionary::parse(&data).unwrap();
        assert_eq!(dictionary.find(1).unwrap().value, Value::CString("Fog"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(Dictionary::parse(&[]).unwrap_err(), DictError::Truncated);
        assert_eq!(
            Dictionary::parse(&[1, 0, 0, 0, 0, 3, 4, 0, 1]).unwrap_err(),
            DictError::Truncated
        );
        assert_eq!(
            Dictionary::parse(&[1, 0, 0, 0, 0, 9, 0, 0]).unwrap_err(),
            DictError::UnknownType(9)
        );
        assert_eq!(
            Dictionary::parse(&[1, 0, 0, 0, 0, 3, 3, 0, 1, 2, 3]).unwrap_err(),
            DictError::InvalidLength
        );
        assert_eq!(
            Dictionary::parse(&[1, 1, 0, 0, 0, 1, 2, 0, 0xff, 0]).unwrap_err(),
            DictError::InvalidUtf8
        );
        assert_eq!(
            Dictionary::parse(&[0, 42]).unwrap_err(),
            DictError::TrailingBytes
        );
    }

    #[test]
    fn empty_dictionary() {
        let dictionary = Dictionary::parse(&[0]).unwrap();
        assert!(dictionary.is_empty());
        assert_eq!(dictionary.iter().count(), 0);
    }

    #[test]
    fn writer_reports_full_buffer() {
        let mut buf = [0u8; 8];
        let mut writer = DictionaryWriter::new(&mut buf).unwrap();
        assert_eq!(writer.write_int(0, 1), Err(DictError::BufferFull));
        assert_eq!(writer.finish(), &[0]);
        assert!(DictionaryWriter::new(&mut []).is_err());
    }
}
