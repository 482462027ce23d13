// ABOUTME: Long-message segmentation into UDH-tagged UCS-2 parts
// ABOUTME: Each part becomes an independent Submit sharing one reference number

use crate::codec::content::{Udh, encode_ucs2};
use bytes::{BufMut, Bytes, BytesMut};

/// Characters that fit a single message before segmentation kicks in.
pub const DEFAULT_SEGMENT_LIMIT: usize = 70;

/// Highest reference number before the counter wraps back to 1.
pub const MAX_REFERENCE: u8 = 127;

/// One part of a long message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub reference: u8,
    pub total: u8,
    /// 1-based position of this part.
    pub number: u8,
    /// UDH followed by this part's slice of the UCS-2 text.
    pub payload: Bytes,
}

/// Splits oversized text into concatenated-SMS parts.
///
/// Owns the reference counter, so each session keeps its own sequence of
/// reference numbers.
#[derive(Debug, Clone)]
pub struct Segmenter {
    limit: usize,
    next_reference: u8,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_LIMIT)
    }
}

impl Segmenter {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            next_reference: 1,
        }
    }

    /// Payload bytes per part once the UDH is reserved.
    pub fn capacity(&self) -> usize {
        (self.limit * 2).saturating_sub(Udh::LEN)
    }

    pub fn needs_segmentation(&self, text: &str) -> bool {
        text.chars().count() > self.limit
    }

    fn next_reference(&mut self) -> u8 {
        let reference = self.next_reference;
        self.next_reference = if reference >= MAX_REFERENCE { 1 } else { reference + 1 };
        reference
    }

    /// Split `text` into parts, or `None` when it fits one message.
    ///
    /// Returns `None` as well when the text would need more than 255 parts,
    /// which the one-byte `PkTotal` cannot express.
    pub fn split(&mut self, text: &str) -> Option<Vec<Segment>> {
        if !self.needs_segmentation(text) {
            return None;
        }

        let encoded = encode_ucs2(text);
        let capacity = self.capacity().max(2);
        let total = u8::try_from(encoded.len().div_ceil(capacity)).ok()?;
        let reference = self.next_reference();

        let segments = encoded
            .chunks(capacity)
            .zip(1..=total)
            .map(|(chunk, number)| {
                let udh = Udh {
                    reference,
                    total,
                    sequence: number,
                };
                let mut payload = BytesMut::with_capacity(Udh::LEN + chunk.len());
                payload.put_slice(&udh.to_bytes());
                payload.put_slice(chunk);
                Segment {
                    reference,
                    total,
                    number,
                    payload: payload.freeze(),
                }
            })
            .collect();
        Some(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::content::{decode_text, msg_format};

    #[test]
    fn test_short_text_is_not_split() {
        let mut segmenter = Segmenter::default();
        assert!(segmenter.split(&"a".repeat(70)).is_none());
        assert!(segmenter.split("hello").is_none());
    }

    #[test]
    fn test_hundred_chars_make_two_segments() {
        let mut segmenter = Segmenter::default();
        assert_eq!(segmenter.capacity(), 134);

        let segments = segmenter.split(&"长".repeat(100)).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].payload.len(), 6 + 134);
        assert_eq!(segments[1].payload.len(), 6 + 66);
        assert!(segments.iter().all(|s| s.payload.len() <= 140));
        assert_eq!(segments[0].reference, segments[1].reference);
        assert_eq!(
            segments.iter().map(|s| s.number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(segments.iter().all(|s| s.total == 2));
    }

    #[test]
    fn test_segments_decode_back_to_text() {
        let text: String = ('a'..='z').cycle().take(150).collect();
        let segments = Segmenter::default().split(&text).unwrap();
        assert_eq!(segments.len(), 3);

        let mut joined = String::new();
        for segment in &segments {
            let decoded = decode_text(msg_format::UCS2, &segment.payload);
            let udh = decoded.udh.unwrap();
            assert_eq!(udh.sequence, segment.number);
            assert_eq!(udh.total, 3);
            joined.push_str(&decoded.text);
        }
        assert_eq!(joined, text);
    }

    #[test]
    fn test_reference_wraps_at_127() {
        let mut segmenter = Segmenter::default();
        segmenter.next_reference = 126;
        let long = "x".repeat(71);

        let refs: Vec<u8> = (0..3)
            .map(|_| segmenter.split(&long).unwrap()[0].reference)
            .collect();
        assert_eq!(refs, vec![126, 127, 1]);
    }
}
