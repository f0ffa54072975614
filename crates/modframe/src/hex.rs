use crate::exit::{CliError, CliResult, USAGE};

/// Parse a hex byte string.
///
/// Accepts an optional `0x` prefix and any mix of spaces, colons, dashes or
/// commas between digits, e.g. `"00 01 00 00"`, `"0x00010000"`, `"00:01"`.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !matches!(b, b' ' | b':' | b'-' | b',' | b'\t' | b'\n' | b'\r'))
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("hex input has an odd number of digits ({})", digits.len()),
        ));
    }

    digits
        .chunks_exact(2)
        .map(|pair| -> CliResult<u8> { Ok((nibble(pair[0])? << 4) | nibble(pair[1])?) })
        .collect()
}

fn nibble(digit: u8) -> CliResult<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(CliError::new(
            USAGE,
            format!("invalid hex digit: {:?}", other as char),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_and_packed_forms() {
        assert_eq!(parse_hex("00 01 ff").unwrap(), vec![0x00, 0x01, 0xFF]);
        assert_eq!(parse_hex("0x0001FF").unwrap(), vec![0x00, 0x01, 0xFF]);
        assert_eq!(parse_hex("00:01-Ab,cd").unwrap(), vec![0x00, 0x01, 0xAB, 0xCD]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_hex("abc").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }
}
