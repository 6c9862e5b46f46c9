//! Wire format for actuator commands
//!
//! A command is the ASCII text `"<pan>,<tilt>"` with exactly two decimals per
//! value, e.g. `"12.34,-5.00"`. No prefix, checksum or terminator: one write
//! carries one complete command.

use crate::error::CoreError;
use crate::types::AnglePair;
use bytes::Bytes;

/// Encode a pan/tilt pair. Callers clamp to the wire range first.
pub fn encode_command(pair: AnglePair) -> Bytes {
    Bytes::from(format!("{},{}", format_axis(pair.pan), format_axis(pair.tilt)))
}

/// Parse a payload produced by [`encode_command`]
pub fn decode_command(payload: &[u8]) -> Result<AnglePair, CoreError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| CoreError::Codec(format!("Payload is not UTF-8: {}", e)))?;

    let (pan, tilt) = text
        .split_once(',')
        .ok_or_else(|| CoreError::Codec(format!("Missing separator in '{}'", text)))?;

    Ok(AnglePair::new(parse_axis(pan)?, parse_axis(tilt)?))
}

fn format_axis(value: f64) -> String {
    let text = format!("{:.2}", value);
    // Values that round to zero from below would otherwise read "-0.00"
    if text == "-0.00" {
        "0.00".to_string()
    } else {
        text
    }
}

fn parse_axis(text: &str) -> Result<f64, CoreError> {
    let value: f64 = text
        .parse()
        .map_err(|e| CoreError::Codec(format!("Invalid axis value '{}': {}", text, e)))?;
    if !value.is_finite() {
        return Err(CoreError::Codec(format!("Non-finite axis value '{}'", text)));
    }
    Ok(value)
}
