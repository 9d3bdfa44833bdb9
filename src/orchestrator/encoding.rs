//! Conversions between plan text and ABI values.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::B256;

/// Right-pad UTF-8 text into a `bytes32`. Fails above 32 bytes.
pub fn bytes32_from_text(text: &str) -> Result<B256, String> {
    fixed_bytes_from_text(text, 32)
}

fn fixed_bytes_from_text(text: &str, size: usize) -> Result<B256, String> {
    let raw = text.as_bytes();
    if raw.len() > size {
        return Err(format!(
            "'{}' is {} bytes, bytes{} holds at most {}",
            text,
            raw.len(),
            size,
            size
        ));
    }
    let mut word = B256::ZERO;
    word[..raw.len()].copy_from_slice(raw);
    Ok(word)
}

/// Inverse of [`bytes32_from_text`]: strip trailing zero padding and decode.
/// `None` when the content is not printable UTF-8.
pub fn text_from_bytes32(word: &[u8]) -> Option<String> {
    let end = word.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let text = std::str::from_utf8(&word[..end]).ok()?;
    if text.chars().all(|c| !c.is_control()) {
        Some(text.to_string())
    } else {
        None
    }
}

/// Parse `text` as a value of type `ty`.
///
/// Non-hex text for a `bytesN` parameter is taken as UTF-8 and right-padded,
/// which is how proposal names are passed.
pub fn coerce_literal(text: &str, ty: &DynSolType) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::FixedBytes(size) if !text.starts_with("0x") => {
            fixed_bytes_from_text(text, *size).map(|word| DynSolValue::FixedBytes(word, *size))
        }
        _ => ty.coerce_str(text).map_err(|e| e.to_string()),
    }
}

/// Fit an already-typed value to the parameter's width where that is lossless.
///
/// Bindings carry `uint256`; a `uint64` parameter needs the same number
/// tagged with 64 bits or encoding rejects it.
pub fn conform(value: DynSolValue, ty: &DynSolType) -> Result<DynSolValue, String> {
    match (value, ty) {
        (DynSolValue::Uint(v, _), DynSolType::Uint(bits)) => {
            if v.bit_len() > *bits {
                Err(format!("{} does not fit in uint{}", v, bits))
            } else {
                Ok(DynSolValue::Uint(v, *bits))
            }
        }
        (DynSolValue::Int(v, _), DynSolType::Int(bits)) => Ok(DynSolValue::Int(v, *bits)),
        (DynSolValue::Array(items), DynSolType::Array(inner)) => items
            .into_iter()
            .map(|item| conform(item, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (value, ty) if ty.matches(&value) => Ok(value),
        (value, ty) => Err(format!(
            "{} is not a {}",
            display_value(&value),
            ty.sol_type_name()
        )),
    }
}

/// Human-readable rendering for logs and reports.
pub fn display_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(a) => a.to_string(),
        DynSolValue::FixedBytes(word, size) => match text_from_bytes32(&word[..*size]) {
            Some(text) if !text.is_empty() => text,
            _ => alloy::hex::encode_prefixed(&word[..*size]),
        },
        DynSolValue::Bytes(b) => alloy::hex::encode_prefixed(b),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            format!("[{}]", join(items))
        }
        DynSolValue::Tuple(items) => format!("({})", join(items)),
        other => format!("{:?}", other),
    }
}

fn join(items: &[DynSolValue]) -> String {
    items.iter().map(display_value).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    #[test]
    fn test_bytes32_padding() {
        let word = bytes32_from_text("Proposal 1").unwrap();
        assert_eq!(&word[..10], b"Proposal 1");
        assert!(word[10..].iter().all(|b| *b == 0));
        assert_eq!(text_from_bytes32(word.as_slice()).as_deref(), Some("Proposal 1"));
    }

    #[test]
    fn test_bytes32_overflow_rejected() {
        let long = "x".repeat(33);
        assert!(bytes32_from_text(&long).is_err());
        assert!(bytes32_from_text(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn test_non_text_bytes32() {
        let mut raw = [0u8; 32];
        raw[0] = 0x01;
        assert_eq!(text_from_bytes32(&raw), None);
        assert_eq!(text_from_bytes32(&[0u8; 32]).as_deref(), Some(""));
    }

    #[test]
    fn test_coerce_literals() {
        let v = coerce_literal("1000", &DynSolType::Uint(256)).unwrap();
        assert_eq!(v, DynSolValue::Uint(U256::from(1000u64), 256));

        let v = coerce_literal("Chocolate", &DynSolType::FixedBytes(32)).unwrap();
        assert_eq!(display_value(&v), "Chocolate");

        let hex = format!("0x{}", "ab".repeat(32));
        let v = coerce_literal(&hex, &DynSolType::FixedBytes(32)).unwrap();
        assert_eq!(v, DynSolValue::FixedBytes(B256::repeat_byte(0xab), 32));

        assert!(coerce_literal("not a number", &DynSolType::Uint(256)).is_err());
        assert!(coerce_literal("0x1234", &DynSolType::Address).is_err());
    }

    #[test]
    fn test_conform_narrows_uint() {
        let v = conform(DynSolValue::Uint(U256::from(7u64), 256), &DynSolType::Uint(64)).unwrap();
        assert_eq!(v, DynSolValue::Uint(U256::from(7u64), 64));

        let too_big = DynSolValue::Uint(U256::from(300u64), 256);
        assert!(conform(too_big, &DynSolType::Uint(8)).is_err());
    }

    #[test]
    fn test_conform_rejects_wrong_kind() {
        let err = conform(DynSolValue::Uint(U256::from(1u64), 256), &DynSolType::Address).unwrap_err();
        assert!(err.contains("address"));
        let addr = DynSolValue::Address(Address::ZERO);
        assert!(conform(addr, &DynSolType::Address).is_ok());
    }

    #[test]
    fn test_display_composites() {
        let v = DynSolValue::Tuple(vec![
            DynSolValue::Bool(true),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(1u64), 256)]),
        ]);
        assert_eq!(display_value(&v), "(true, [1])");
    }
}
