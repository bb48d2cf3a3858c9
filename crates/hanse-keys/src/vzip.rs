//! The protocol's LZMA chunk container.
//!
//! Layout: `VZ` magic, version byte `a`, a reserved little-endian u32,
//! five LZMA property bytes, the raw LZMA stream, then a footer of
//! CRC32-of-plaintext, plaintext length (u32 LE) and `zv` magic.

use xz2::stream::{Action, LzmaOptions, Status, Stream};

use crate::error::{ProcessError, Result};

pub(crate) const VZIP_MAGIC: u16 = 0x5a56; // "VZ"
const FOOTER_MAGIC: u16 = 0x767a; // "zv"
const VERSION: u8 = b'a';

const HEADER_LEN: usize = 7;
const PROPS_LEN: usize = 5;
const FOOTER_LEN: usize = 10;

/// Decompress a `VZ` container into `destination`, returning the number of
/// plaintext bytes written.
pub fn decompress(input: &[u8], destination: &mut [u8]) -> Result<usize> {
    if input.len() < HEADER_LEN + PROPS_LEN + FOOTER_LEN {
        return Err(ProcessError::Malformed("vzip payload truncated".into()));
    }
    let magic = u16::from_le_bytes([input[0], input[1]]);
    if magic != VZIP_MAGIC {
        return Err(ProcessError::UnknownFormat(magic));
    }
    if input[2] != VERSION {
        return Err(ProcessError::Malformed(format!(
            "unsupported vzip version {:#04x}",
            input[2]
        )));
    }

    let footer = &input[input.len() - FOOTER_LEN..];
    let expected_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    let size = u32::from_le_bytes([footer[4], footer[5], footer[6], footer[7]]) as usize;
    let footer_magic = u16::from_le_bytes([footer[8], footer[9]]);
    if footer_magic != FOOTER_MAGIC {
        return Err(ProcessError::Malformed("vzip footer magic missing".into()));
    }
    if destination.len() < size {
        return Err(ProcessError::OutputTooSmall {
            needed: size,
            capacity: destination.len(),
        });
    }

    let props = &input[HEADER_LEN..HEADER_LEN + PROPS_LEN];
    let data = &input[HEADER_LEN + PROPS_LEN..input.len() - FOOTER_LEN];

    // Rebuild an lzma-alone header: properties followed by the 64-bit
    // plaintext size. The decoder then stops by itself at `size` bytes.
    let mut stream_input = Vec::with_capacity(PROPS_LEN + 8 + data.len());
    stream_input.extend_from_slice(props);
    stream_input.extend_from_slice(&(size as u64).to_le_bytes());
    stream_input.extend_from_slice(data);

    let mut decoder =
        Stream::new_lzma_decoder(u64::MAX).map_err(|e| ProcessError::Lzma(e.to_string()))?;
    let written = run_decoder(&mut decoder, &stream_input, &mut destination[..size])?;
    if written != size {
        return Err(ProcessError::Malformed(format!(
            "vzip stream ended after {written} of {size} bytes"
        )));
    }

    let crc = crc32(&destination[..size]);
    if crc != expected_crc {
        return Err(ProcessError::ChecksumMismatch {
            expected: expected_crc,
            actual: crc,
        });
    }
    Ok(size)
}

/// Compress `input` into a `VZ` container.
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let options = LzmaOptions::new_preset(6).map_err(|e| ProcessError::Lzma(e.to_string()))?;
    let mut encoder =
        Stream::new_lzma_encoder(&options).map_err(|e| ProcessError::Lzma(e.to_string()))?;

    // The encoder emits an lzma-alone stream: 5 property bytes, a 64-bit
    // size field, then the raw stream. The container keeps the properties
    // and the raw stream; the size travels in the container footer instead.
    let mut encoded = Vec::new();
    let mut scratch = [0u8; 8192];
    let mut remaining = input;
    loop {
        let action = if remaining.is_empty() {
            Action::Finish
        } else {
            Action::Run
        };
        let before_in = encoder.total_in();
        let before_out = encoder.total_out();
        let status = encoder
            .process(remaining, &mut scratch, action)
            .map_err(|e| ProcessError::Lzma(e.to_string()))?;
        let consumed = (encoder.total_in() - before_in) as usize;
        let produced = (encoder.total_out() - before_out) as usize;
        remaining = &remaining[consumed..];
        encoded.extend_from_slice(&scratch[..produced]);
        if matches!(status, Status::StreamEnd) {
            break;
        }
    }
    if encoded.len() < PROPS_LEN + 8 {
        return Err(ProcessError::Lzma("encoder produced no header".into()));
    }
    let props = &encoded[..PROPS_LEN];
    let data = &encoded[PROPS_LEN + 8..];

    let mut out = Vec::with_capacity(HEADER_LEN + PROPS_LEN + data.len() + FOOTER_LEN);
    out.extend_from_slice(&VZIP_MAGIC.to_le_bytes());
    out.push(VERSION);
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved timestamp field
    out.extend_from_slice(props);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc32(input).to_le_bytes());
    out.extend_from_slice(&(input.len() as u32).to_le_bytes());
    out.extend_from_slice(&FOOTER_MAGIC.to_le_bytes());
    Ok(out)
}

fn run_decoder(decoder: &mut Stream, mut input: &[u8], output: &mut [u8]) -> Result<usize> {
    let mut written = 0;
    loop {
        let before_in = decoder.total_in();
        let before_out = decoder.total_out();
        let status = decoder
            .process(input, &mut output[written..], Action::Run)
            .map_err(|e| ProcessError::Lzma(e.to_string()))?;
        let consumed = (decoder.total_in() - before_in) as usize;
        let produced = (decoder.total_out() - before_out) as usize;
        input = &input[consumed..];
        written += produced;
        if matches!(status, Status::StreamEnd) || written == output.len() {
            return Ok(written);
        }
        if consumed == 0 && produced == 0 {
            return Err(ProcessError::Lzma("stalled lzma stream".into()));
        }
    }
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}
