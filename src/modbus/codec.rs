//! Register value codec.
//!
//! Decodes a run of 16-bit register words into a numeric value given the
//! declared type, byte order and word order. Scaling is the caller's job so
//! the codec stays a pure, independently testable function.

use half::f16;

use crate::config::{Endian, ValueType};
use crate::utils::error::PollError;

/// Decode raw register words into the numeric value they encode.
///
/// The word sequence is normalized most-significant-word-first, each word
/// is serialized per `byte_order`, and the resulting buffer is interpreted
/// as the big-endian bit pattern of `data_type`.
pub fn decode_registers(
    words: &[u16],
    data_type: ValueType,
    byte_order: Endian,
    word_order: Endian,
) -> Result<f64, PollError> {
    let expected = data_type.word_count() as usize;
    if words.len() != expected {
        return Err(PollError::Decode(format!(
            "{} needs {} register word(s), got {}",
            data_type,
            expected,
            words.len()
        )));
    }

    let bytes = registers_to_bytes(words, byte_order, word_order);
    let value = match data_type {
        ValueType::Float16 => f16::from_bits(u16::from_be_bytes([bytes[0], bytes[1]])).to_f64(),
        ValueType::Int16 => i16::from_be_bytes([bytes[0], bytes[1]]) as f64,
        ValueType::UInt16 => u16::from_be_bytes([bytes[0], bytes[1]]) as f64,
        ValueType::Float32 => {
            f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
        }
        ValueType::Int32 => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        ValueType::UInt32 => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        ValueType::Float64 => f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        ValueType::Int64 => i64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
        ValueType::UInt64 => u64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
    };
    Ok(value)
}

/// Inverse of [`decode_registers`]: produce the register words a device
/// using the given orders would serve for `value`.
pub fn encode_value(
    value: f64,
    data_type: ValueType,
    byte_order: Endian,
    word_order: Endian,
) -> Vec<u16> {
    let bytes: Vec<u8> = match data_type {
        ValueType::Float16 => f16::from_f64(value).to_bits().to_be_bytes().to_vec(),
        ValueType::Int16 => (value as i16).to_be_bytes().to_vec(),
        ValueType::UInt16 => (value as u16).to_be_bytes().to_vec(),
        ValueType::Float32 => (value as f32).to_be_bytes().to_vec(),
        ValueType::Int32 => (value as i32).to_be_bytes().to_vec(),
        ValueType::UInt32 => (value as u32).to_be_bytes().to_vec(),
        ValueType::Float64 => value.to_be_bytes().to_vec(),
        ValueType::Int64 => (value as i64).to_be_bytes().to_vec(),
        ValueType::UInt64 => (value as u64).to_be_bytes().to_vec(),
    };
    bytes_to_registers(&bytes, byte_order, word_order)
}

fn registers_to_bytes(words: &[u16], byte_order: Endian, word_order: Endian) -> Vec<u8> {
    let mut ordered = words.to_vec();
    if word_order == Endian::Little {
        ordered.reverse();
    }

    let mut bytes = Vec::with_capacity(ordered.len() * 2);
    for word in ordered {
        let pair = match byte_order {
            Endian::Big => word.to_be_bytes(),
            Endian::Little => word.to_le_bytes(),
        };
        bytes.extend_from_slice(&pair);
    }
    bytes
}

fn bytes_to_registers(bytes: &[u8], byte_order: Endian, word_order: Endian) -> Vec<u16> {
    let mut words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| match byte_order {
            Endian::Big => u16::from_be_bytes([pair[0], pair[1]]),
            Endian::Little => u16::from_le_bytes([pair[0], pair[1]]),
        })
        .collect();
    if word_order == Endian::Little {
        words.reverse();
    }
    words
}
