use bytes::{Buf, BytesMut};
use encoding_rs::CoderResult;
use std::io;
use tokio_util::codec::Decoder;

/// Decodes a byte stream in some legacy charset into UTF-8 frames.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
    finished: bool,
}

impl Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder_with_bom_removal(),
            finished: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> BytesMut {
        let mut out = BytesMut::new();
        loop {
            let room = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or_else(|| src.len() * 3)
                .max(16);
            let start = out.len();
            out.resize(start + room, 0);

            let (result, read, written, _had_errors) =
                self.decoder.decode_to_utf8(&src[..], &mut out[start..], last);
            out.truncate(start + written);
            src.advance(read);

            if let CoderResult::InputEmpty = result {
                return out;
            }
        }
    }
}

impl Decoder for Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        // Incomplete multi-byte sequences stay buffered inside the decoder.
        let out = self.transcode(src, false);
        Ok((!out.is_empty()).then_some(out))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            buf.clear();
            return Ok(None);
        }
        self.finished = true;
        let out = self.transcode(buf, true);
        buf.clear();
        Ok((!out.is_empty()).then_some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_is_transcoded_to_utf8() {
        let mut t = Transcoder::new(encoding_rs::WINDOWS_1252);
        let mut src = BytesMut::from(&b"caf\xe9,na\xefve\n"[..]);
        let out = t.decode(&mut src).unwrap().unwrap();
        assert_eq!(&out[..], "café,naïve\n".as_bytes());
        assert!(src.is_empty());
        assert!(t.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn split_utf16_unit_is_held_until_complete() {
        let mut t = Transcoder::new(encoding_rs::UTF_16LE);
        // "ab" in UTF-16LE, split in the middle of the second code unit
        let mut first = BytesMut::from(&b"a\x00b"[..]);
        let out = t.decode(&mut first).unwrap().unwrap();
        assert_eq!(&out[..], b"a");
        let mut second = BytesMut::from(&b"\x00"[..]);
        let out = t.decode(&mut second).unwrap().unwrap();
        assert_eq!(&out[..], b"b");
    }
}
