//! CRC-16/CCITT-FALSE checksum used by the BR Code trailer (tag 63)

/// Generator polynomial x^16 + x^12 + x^5 + 1
const POLYNOMIAL: u16 = 0x1021;

/// Initial register value
const INITIAL: u16 = 0xFFFF;

/// Compute CRC-16/CCITT-FALSE over raw bytes.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc = INITIAL;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Checksum of `payload` as 4 uppercase, zero-padded hex digits.
pub fn crc16_hex(payload: &str) -> String {
    format!("{:04X}", crc16_ccitt(payload.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard CRC-16/CCITT-FALSE check input
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
        assert_eq!(crc16_hex("123456789"), "29B1");
    }

    #[test]
    fn test_empty_input_is_initial_register() {
        assert_eq!(crc16_ccitt(b""), 0xFFFF);
    }

    #[test]
    fn test_central_bank_example() {
        let body = "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-426655440000\
                    5204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***6304";
        assert_eq!(crc16_hex(body), "1D3D");
    }

    #[test]
    fn test_zero_padding() {
        let body = "00020126360014BR.GOV.BCB.PIX0114+5511999998888\
                    5204000053039865802BR5904Loja6014RIO DE JANEIRO6304";
        let hex = crc16_hex(body);
        assert_eq!(hex, "00AF");
        assert_eq!(hex.len(), 4);
    }
}
