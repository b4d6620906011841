//! HTTP bodies.

use bytes::{Bytes, BytesMut};
use std::fmt::Debug;
use std::io::{Read, Write};

/// An HTTP body that can be read from, written to, or appended to another body.
///
/// Unlike a streaming body held open against a live connection, a [`Body`] here is a
/// fully buffered snapshot. That is what the cache partitions store, and it is what
/// makes responses cheaply cloneable: a cached entry must be returnable any number of
/// times after the originating network exchange is gone.
#[derive(Clone, Default)]
pub struct Body {
    buf: BytesMut,
}

impl Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({} bytes)", self.buf.len())
    }
}

impl Body {
    /// Get a new, empty HTTP body.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of bytes currently in the body.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Return whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Read the entirety of the body into a byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Read the entirety of the body as [`Bytes`].
    pub fn into_body_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Borrow the body's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Read the entirety of the body into a `String`, interpreting the bytes as UTF-8.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid UTF-8.
    pub fn into_string(self) -> String {
        String::from_utf8(self.into_bytes()).expect("body was not valid UTF-8")
    }

    /// Append another body onto the end of this body.
    pub fn append(&mut self, other: Body) {
        self.buf.extend_from_slice(&other.buf);
    }

    /// Write a slice of bytes to the end of this body, and return the number of bytes
    /// written.
    ///
    /// # Examples
    ///
    /// ```
    /// # let mut body = sw_cache::Body::new();
    /// body.write_bytes(&[0, 1, 2, 3]);
    /// ```
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        self.buf.extend_from_slice(bytes);
        bytes.len()
    }

    /// Write a string slice to the end of this body, and return the number of bytes
    /// written.
    pub fn write_str(&mut self, string: &str) -> usize {
        self.write_bytes(string.as_ref())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            buf: BytesMut::from(&bytes[..]),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            buf: BytesMut::from(bytes.as_slice()),
        }
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Self {
            buf: BytesMut::from(bytes),
        }
    }
}

impl From<String> for Body {
    fn from(string: String) -> Self {
        string.into_bytes().into()
    }
}

impl From<&str> for Body {
    fn from(string: &str) -> Self {
        string.as_bytes().into()
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = std::cmp::min(buf.len(), self.buf.len());
        let front = self.buf.split_to(n);
        buf[..n].copy_from_slice(&front);
        Ok(n)
    }
}

impl Write for Body {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(self.write_bytes(buf))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_concatenates_in_order() {
        let mut body = Body::from("hello, ");
        body.append(Body::from("world"));
        assert_eq!(body.into_string(), "hello, world");
    }

    #[test]
    fn read_consumes_from_the_front() {
        let mut body = Body::from("abcdef");
        let mut buf = [0u8; 4];
        body.read(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
        assert_eq!(body.into_string(), "ef");
    }
}
