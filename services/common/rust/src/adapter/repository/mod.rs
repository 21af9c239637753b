use std::fmt::Write;
use std::result::Result;

use crate::error::AppErrorCode;
use crate::util::hex_to_octet;

const OID_BYTE_LENGTH: usize = 16;

/*
* Object IDs in this project are 128-bit UUIDs rendered as 32 hex characters,
* SQL databases keep them in `BINARY(16)` columns, this struct converts between
* the 2 representations and rejects any hex string with different size.
* */
pub struct OidBytes(pub [u8; OID_BYTE_LENGTH]);

impl<'a> TryFrom<&'a str> for OidBytes {
    type Error = (AppErrorCode, String);
    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        if value.len() == (OID_BYTE_LENGTH << 1) {
            let src = hex_to_octet(value)?;
            let mut dst = [0; OID_BYTE_LENGTH];
            dst.copy_from_slice(&src);
            Ok(OidBytes(dst))
        } else {
            let detail = format!("oid-size-not-fit: {value}");
            Err((AppErrorCode::InvalidInput, detail))
        }
    }
}

impl OidBytes {
    pub fn as_column(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn to_app_oid(raw: Vec<u8>) -> Result<String, (AppErrorCode, String)> {
        if raw.len() != OID_BYTE_LENGTH {
            let detail = format!("fetched-id-len: {}", raw.len());
            Err((AppErrorCode::DataCorruption, detail))
        } else {
            let mut out = String::with_capacity(OID_BYTE_LENGTH << 1);
            for b in raw {
                write!(&mut out, "{:02x}", b)
                    .map_err(|e| (AppErrorCode::DataCorruption, e.to_string()))?;
            }
            Ok(out)
        }
    }
}
