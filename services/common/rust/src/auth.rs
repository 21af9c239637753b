use serde::Deserialize;
use std::result::Result;

// permissions and quota in an authenticated claim are scoped by numeric code
// of each application, claims issued for other applications are rejected
struct ExpectedApCode<'a> {
    code: u8,
    label: &'a str,
}

impl<'a> serde::de::Expected for ExpectedApCode<'a> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "expect ap-code: {}, label:{}", self.code, self.label)
    }
}

pub fn jsn_validate_ap_code<'de, D>(
    raw: D,
    quota_ap_code: u8,
    app_label: &str,
) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let val = u8::deserialize(raw)?;
    if val == quota_ap_code {
        Ok(val)
    } else {
        let unexp = serde::de::Unexpected::Unsigned(val as u64);
        let exp = ExpectedApCode {
            code: quota_ap_code,
            label: app_label,
        };
        Err(serde::de::Error::invalid_value(unexp, &exp))
    }
}

struct ExpectedMatCodeRange {
    max_: u8,
    min_: u8,
}

impl serde::de::Expected for ExpectedMatCodeRange {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "valid range: {}-{}", self.min_, self.max_)
    }
}

pub fn quota_matcode_deserialize_error<'de, D>(given: u8, valid: (u8, u8)) -> D::Error
where
    D: serde::Deserializer<'de>,
{
    let unexp = serde::de::Unexpected::Unsigned(given as u64);
    let exp = ExpectedMatCodeRange {
        min_: valid.0,
        max_: valid.1,
    };
    serde::de::Error::invalid_value(unexp, &exp)
}
