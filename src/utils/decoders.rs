//! Decoding of dynamic storage values

use subxt::dynamic::Value;

use crate::error::{Error, Result};

/// Decode u128 from Value
pub fn decode_u128(value: &Value) -> Result<u128> {
    value
        .as_u128()
        .ok_or_else(|| Error::decode(format!("Failed to parse u128 from {:?}", value)))
}

/// Decode u64 from Value
pub fn decode_u64(value: &Value) -> Result<u64> {
    let n = decode_u128(value)?;
    u64::try_from(n).map_err(|_| Error::decode(format!("{} does not fit into u64", n)))
}

/// Decode bool from Value; some runtimes store flags as `0`/`1`
pub fn decode_bool(value: &Value) -> Result<bool> {
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    match value.as_u128() {
        Some(n) => Ok(n != 0),
        None => Err(Error::decode(format!("Cannot decode bool from {:?}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_numbers() {
        assert_eq!(decode_u128(&Value::u128(42)).unwrap(), 42);
        assert_eq!(decode_u64(&Value::u128(10_000_000)).unwrap(), 10_000_000);
        assert!(decode_u64(&Value::u128(u128::MAX)).is_err());
        assert!(decode_u64(&Value::string("x")).is_err());
    }

    #[test]
    fn test_decode_bool() {
        assert!(decode_bool(&Value::bool(true)).unwrap());
        assert!(!decode_bool(&Value::bool(false)).unwrap());
        assert!(decode_bool(&Value::u128(1)).unwrap());
        assert!(decode_bool(&Value::string("yes")).is_err());
    }
}
