use bytes::Bytes;
use std::ops::Deref;

/// One encoded JPEG image.
///
/// Cloning is cheap (the bytes are reference counted), so a consumer can keep
/// its copy for as long as it needs after the buffer has moved on.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self(Bytes::from(data))
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Self(data)
    }
}

impl From<&'static [u8]> for Frame {
    fn from(data: &'static [u8]) -> Self {
        Self(Bytes::from_static(data))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame").field("len", &self.0.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let frame = Frame::from(vec![0xFF, 0xD8, 0xFF, 0xD9]);
        let copy = frame.clone();

        assert_eq!(copy.as_bytes().as_ptr(), frame.as_bytes().as_ptr());
        assert_eq!(&copy[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn debug_does_not_dump_pixels() {
        let frame = Frame::from(&b"jpeg-bytes"[..]);
        assert_eq!(format!("{:?}", frame), "Frame { len: 10 }");
    }
}
