/// One captured block of audio (16-bit PCM, little endian, mono)
///
/// The bytes are copied out of the capture buffer when the frame is built and
/// cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Box<[u8]>,
}

impl Frame {
    /// Copy a raw capture buffer into a new frame
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Build a frame from i16 samples
    pub fn from_samples(samples: &[i16]) -> Self {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of 16-bit samples in this frame
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / 2
    }
}

/// What crosses from the capture worker to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Frame(Frame),
    /// End of stream; always the last delivery
    End,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_is_little_endian() {
        let frame = Frame::from_samples(&[1, -2]);
        assert_eq!(frame.as_bytes(), &[0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(frame.sample_count(), 2);
    }

    #[test]
    fn test_copy_is_detached_from_source_buffer() {
        let mut buffer = vec![7u8; 4];
        let frame = Frame::copy_from(&buffer);
        buffer[0] = 0;
        assert_eq!(frame.as_bytes(), &[7, 7, 7, 7]);
    }
}
