//! Minimal IPP/1.1 message encoding (RFC 8010)
//!
//! Only what the CUPS client needs: building requests with operation and
//! job attribute groups, and parsing responses into attribute groups.
//!
//! Wire layout:
//!
//! ```text
//! version(2) op-or-status(2) request-id(4)
//! { group-tag(1) { value-tag(1) name-len(2) name value-len(2) value }* }*
//! end-of-attributes(1) [document data]
//! ```

use thiserror::Error;

/// Operation ids
pub mod operation {
    pub const PRINT_JOB: u16 = 0x0002;
    pub const GET_JOBS: u16 = 0x000A;
    pub const GET_PRINTER_ATTRIBUTES: u16 = 0x000B;
    pub const CUPS_GET_PRINTERS: u16 = 0x4002;
}

/// Status codes
pub mod status {
    pub const SUCCESSFUL_OK: u16 = 0x0000;
    pub const CLIENT_ERROR_NOT_FOUND: u16 = 0x0406;
}

/// Delimiter tags
pub mod group {
    pub const OPERATION: u8 = 0x01;
    pub const JOB: u8 = 0x02;
    pub const END_OF_ATTRIBUTES: u8 = 0x03;
    pub const PRINTER: u8 = 0x04;
    pub const UNSUPPORTED: u8 = 0x05;
}

/// Value tags
pub mod tag {
    pub const UNSUPPORTED: u8 = 0x10;
    pub const UNKNOWN: u8 = 0x12;
    pub const NO_VALUE: u8 = 0x13;
    pub const INTEGER: u8 = 0x21;
    pub const BOOLEAN: u8 = 0x22;
    pub const ENUM: u8 = 0x23;
    pub const OCTET_STRING: u8 = 0x30;
    pub const DATE_TIME: u8 = 0x31;
    pub const RESOLUTION: u8 = 0x32;
    pub const RANGE_OF_INTEGER: u8 = 0x33;
    pub const TEXT_WITH_LANGUAGE: u8 = 0x35;
    pub const NAME_WITH_LANGUAGE: u8 = 0x36;
    pub const TEXT: u8 = 0x41;
    pub const NAME: u8 = 0x42;
    pub const KEYWORD: u8 = 0x44;
    pub const URI: u8 = 0x45;
    pub const CHARSET: u8 = 0x47;
    pub const NATURAL_LANGUAGE: u8 = 0x48;
    pub const MIME_MEDIA_TYPE: u8 = 0x49;
}

const IPP_VERSION: [u8; 2] = [0x01, 0x01];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IppError {
    #[error("IPP message truncated at byte {0}")]
    Truncated(usize),
    #[error("Attribute value before any attribute group at byte {0}")]
    NoGroup(usize),
    #[error("Additional value without a preceding attribute at byte {0}")]
    OrphanValue(usize),
    #[error("Invalid {kind} value length {len}")]
    BadLength { kind: &'static str, len: usize },
    #[error("Value of '{attribute}' is {len} bytes, over the 65535 byte limit")]
    ValueTooLong { attribute: String, len: usize },
}

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IppValue {
    Integer(i32),
    Enum(i32),
    Boolean(bool),
    RangeOfInteger(i32, i32),
    /// Text-like values: keyword, name, text, uri, charset, language, mime type
    Text { tag: u8, value: String },
    /// Out-of-band (unsupported / unknown / no-value)
    OutOfBand(u8),
    Other { tag: u8, data: Vec<u8> },
}

impl IppValue {
    pub fn keyword(value: impl Into<String>) -> Self {
        IppValue::Text {
            tag: tag::KEYWORD,
            value: value.into(),
        }
    }

    pub fn name(value: impl Into<String>) -> Self {
        IppValue::Text {
            tag: tag::NAME,
            value: value.into(),
        }
    }

    pub fn uri(value: impl Into<String>) -> Self {
        IppValue::Text {
            tag: tag::URI,
            value: value.into(),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            IppValue::Integer(_) => tag::INTEGER,
            IppValue::Enum(_) => tag::ENUM,
            IppValue::Boolean(_) => tag::BOOLEAN,
            IppValue::RangeOfInteger(..) => tag::RANGE_OF_INTEGER,
            IppValue::Text { tag, .. } => *tag,
            IppValue::OutOfBand(tag) => *tag,
            IppValue::Other { tag, .. } => *tag,
        }
    }

    /// `Err` carries the length of a value that does not fit a 16-bit length field
    fn encode_value(&self, buf: &mut Vec<u8>) -> Result<(), usize> {
        match self {
            IppValue::Integer(v) | IppValue::Enum(v) => {
                put_u16(buf, 4);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            IppValue::Boolean(v) => {
                put_u16(buf, 1);
                buf.push(u8::from(*v));
            }
            IppValue::RangeOfInteger(lo, hi) => {
                put_u16(buf, 8);
                buf.extend_from_slice(&lo.to_be_bytes());
                buf.extend_from_slice(&hi.to_be_bytes());
            }
            IppValue::Text { value, .. } => return put_bytes(buf, value.as_bytes()),
            IppValue::OutOfBand(_) => put_u16(buf, 0),
            IppValue::Other { data, .. } => return put_bytes(buf, data),
        }
        Ok(())
    }

    fn decode(value_tag: u8, data: &[u8]) -> Result<Self, IppError> {
        let value = match value_tag {
            tag::INTEGER | tag::ENUM => {
                let bytes: [u8; 4] = data.try_into().map_err(|_| IppError::BadLength {
                    kind: "integer",
                    len: data.len(),
                })?;
                let v = i32::from_be_bytes(bytes);
                if value_tag == tag::INTEGER {
                    IppValue::Integer(v)
                } else {
                    IppValue::Enum(v)
                }
            }
            tag::BOOLEAN => match data {
                [b] => IppValue::Boolean(*b != 0),
                _ => {
                    return Err(IppError::BadLength {
                        kind: "boolean",
                        len: data.len(),
                    })
                }
            },
            tag::RANGE_OF_INTEGER => {
                if data.len() != 8 {
                    return Err(IppError::BadLength {
                        kind: "rangeOfInteger",
                        len: data.len(),
                    });
                }
                let lo = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                let hi = i32::from_be_bytes([data[4], data[5], data[6], data[7]]);
                IppValue::RangeOfInteger(lo, hi)
            }
            tag::TEXT_WITH_LANGUAGE | tag::NAME_WITH_LANGUAGE => {
                // language-len(2) language text-len(2) text
                let mut cursor = Cursor::new(data);
                let lang_len = cursor.u16()? as usize;
                cursor.take(lang_len)?;
                let text_len = cursor.u16()? as usize;
                let text = cursor.take(text_len)?;
                IppValue::Text {
                    tag: value_tag,
                    value: String::from_utf8_lossy(text).into_owned(),
                }
            }
            0x40..=0x4F => IppValue::Text {
                tag: value_tag,
                value: String::from_utf8_lossy(data).into_owned(),
            },
            tag::UNSUPPORTED..=0x1F => IppValue::OutOfBand(value_tag),
            _ => IppValue::Other {
                tag: value_tag,
                data: data.to_vec(),
            },
        };
        Ok(value)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            IppValue::Integer(v) | IppValue::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IppValue::Text { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// A named attribute with one or more values (`1setOf`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppAttribute {
    pub name: String,
    pub values: Vec<IppValue>,
}

impl IppAttribute {
    pub fn new(name: impl Into<String>, value: IppValue) -> Self {
        Self {
            name: name.into(),
            values: vec![value],
        }
    }

    pub fn multi(name: impl Into<String>, values: Vec<IppValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), IppError> {
        for (i, value) in self.values.iter().enumerate() {
            buf.push(value.tag());
            // additional values carry an empty name
            let name = if i == 0 { self.name.as_bytes() } else { &[] };
            put_bytes(buf, name)
                .and_then(|()| value.encode_value(buf))
                .map_err(|len| IppError::ValueTooLong {
                    attribute: self.name.clone(),
                    len,
                })?;
        }
        Ok(())
    }
}

/// Attributes sharing one delimiter tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppGroup {
    pub tag: u8,
    pub attributes: Vec<IppAttribute>,
}

impl IppGroup {
    pub fn new(tag: u8) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&IppAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// First value of an attribute
    pub fn value(&self, name: &str) -> Option<&IppValue> {
        self.get(name).and_then(|a| a.values.first())
    }

    /// All string values of an attribute
    pub fn strings(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|a| {
                a.values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All integer/enum values of an attribute
    pub fn ints(&self, name: &str) -> Vec<i32> {
        self.get(name)
            .map(|a| a.values.iter().filter_map(IppValue::as_int).collect())
            .unwrap_or_default()
    }
}

/// An outgoing IPP request
#[derive(Debug, Clone)]
pub struct IppRequest {
    pub operation: u16,
    pub request_id: u32,
    pub groups: Vec<IppGroup>,
    /// Document bytes appended after the attributes (Print-Job)
    pub data: Vec<u8>,
}

impl IppRequest {
    /// Start a request with the mandatory charset and language attributes
    pub fn new(operation: u16, request_id: u32) -> Self {
        let mut op_group = IppGroup::new(group::OPERATION);
        op_group.attributes.push(IppAttribute::new(
            "attributes-charset",
            IppValue::Text {
                tag: tag::CHARSET,
                value: "utf-8".to_string(),
            },
        ));
        op_group.attributes.push(IppAttribute::new(
            "attributes-natural-language",
            IppValue::Text {
                tag: tag::NATURAL_LANGUAGE,
                value: "en".to_string(),
            },
        ));
        Self {
            operation,
            request_id,
            groups: vec![op_group],
            data: Vec::new(),
        }
    }

    /// Add an operation attribute
    pub fn operation_attr(mut self, attr: IppAttribute) -> Self {
        self.groups[0].attributes.push(attr);
        self
    }

    /// Add a job template attribute
    pub fn job_attr(mut self, attr: IppAttribute) -> Self {
        match self.groups.iter_mut().find(|g| g.tag == group::JOB) {
            Some(g) => g.attributes.push(attr),
            None => {
                let mut g = IppGroup::new(group::JOB);
                g.attributes.push(attr);
                self.groups.push(g);
            }
        }
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn encode(&self) -> Result<Vec<u8>, IppError> {
        let mut buf = Vec::with_capacity(256 + self.data.len());
        buf.extend_from_slice(&IPP_VERSION);
        put_u16(&mut buf, self.operation);
        buf.extend_from_slice(&self.request_id.to_be_bytes());
        for g in &self.groups {
            buf.push(g.tag);
            for attr in &g.attributes {
                attr.encode(&mut buf)?;
            }
        }
        buf.push(group::END_OF_ATTRIBUTES);
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }
}

/// A parsed IPP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppResponse {
    pub version: (u8, u8),
    pub status: u16,
    pub request_id: u32,
    pub groups: Vec<IppGroup>,
}

impl IppResponse {
    pub fn is_success(&self) -> bool {
        self.status < 0x0100
    }

    /// All groups with the given delimiter tag, in order
    pub fn groups_of(&self, tag: u8) -> impl Iterator<Item = &IppGroup> {
        self.groups.iter().filter(move |g| g.tag == tag)
    }

    /// Human readable status-message from the operation group, if any
    pub fn status_message(&self) -> Option<&str> {
        self.groups_of(group::OPERATION)
            .find_map(|g| g.value("status-message"))
            .and_then(IppValue::as_str)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, IppError> {
        let mut cursor = Cursor::new(bytes);
        let major = cursor.u8()?;
        let minor = cursor.u8()?;
        let status = cursor.u16()?;
        let request_id = cursor.u32()?;

        let mut groups: Vec<IppGroup> = Vec::new();
        loop {
            let pos = cursor.pos;
            let t = cursor.u8()?;
            if t == group::END_OF_ATTRIBUTES {
                break;
            }
            if t < 0x10 {
                groups.push(IppGroup::new(t));
                continue;
            }

            let name_len = cursor.u16()? as usize;
            let name = cursor.take(name_len)?;
            let value_len = cursor.u16()? as usize;
            let data = cursor.take(value_len)?;
            let value = IppValue::decode(t, data)?;

            let current = groups.last_mut().ok_or(IppError::NoGroup(pos))?;
            if name.is_empty() {
                current
                    .attributes
                    .last_mut()
                    .ok_or(IppError::OrphanValue(pos))?
                    .values
                    .push(value);
            } else {
                current.attributes.push(IppAttribute::new(
                    String::from_utf8_lossy(name).into_owned(),
                    value,
                ));
            }
        }

        Ok(Self {
            version: (major, minor),
            status,
            request_id,
            groups,
        })
    }
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Length-prefixed bytes; IPP lengths are 16-bit
fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> Result<(), usize> {
    let len = u16::try_from(bytes.len()).map_err(|_| bytes.len())?;
    put_u16(buf, len);
    buf.extend_from_slice(bytes);
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], IppError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(IppError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, IppError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, IppError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, IppError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a response the way a server would, for parser tests
    pub(crate) fn encode_response(status: u16, request_id: u32, groups: &[IppGroup]) -> Vec<u8> {
        let mut buf = vec![0x01, 0x01];
        put_u16(&mut buf, status);
        buf.extend_from_slice(&request_id.to_be_bytes());
        for g in groups {
            buf.push(g.tag);
            for attr in &g.attributes {
                attr.encode(&mut buf).unwrap();
            }
        }
        buf.push(group::END_OF_ATTRIBUTES);
        buf
    }

    #[test]
    fn test_request_header_and_preamble() {
        let bytes = IppRequest::new(operation::GET_JOBS, 7).encode().unwrap();
        assert_eq!(&bytes[0..2], &[0x01, 0x01]);
        assert_eq!(&bytes[2..4], &[0x00, 0x0A]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 7]);
        assert_eq!(bytes[8], group::OPERATION);
        // attributes-charset first
        assert_eq!(bytes[9], tag::CHARSET);
        assert_eq!(&bytes[10..12], &[0, 18]);
        assert_eq!(&bytes[12..30], b"attributes-charset");
        assert_eq!(&bytes[30..32], &[0, 5]);
        assert_eq!(&bytes[32..37], b"utf-8");
        assert_eq!(*bytes.last().unwrap(), group::END_OF_ATTRIBUTES);
    }

    #[test]
    fn test_additional_values_have_empty_name() {
        let req = IppRequest::new(operation::GET_JOBS, 1).operation_attr(IppAttribute::multi(
            "requested-attributes",
            vec![IppValue::keyword("job-id"), IppValue::keyword("job-state")],
        ));
        let bytes = req.encode().unwrap();
        let needle = b"requested-attributes";
        let at = bytes
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap();
        let after_first = at + needle.len() + 2 + "job-id".len();
        assert_eq!(bytes[after_first], tag::KEYWORD);
        assert_eq!(&bytes[after_first + 1..after_first + 3], &[0, 0]);
    }

    #[test]
    fn test_job_group_and_document_data() {
        let req = IppRequest::new(operation::PRINT_JOB, 2)
            .job_attr(IppAttribute::new("copies", IppValue::Integer(3)))
            .job_attr(IppAttribute::new("page-ranges", IppValue::RangeOfInteger(1, 4)))
            .with_data(b"%PDF".to_vec());
        assert_eq!(req.groups.len(), 2);
        assert_eq!(req.groups[1].attributes.len(), 2);

        let bytes = req.encode().unwrap();
        assert!(bytes.ends_with(&[group::END_OF_ATTRIBUTES, b'%', b'P', b'D', b'F']));
    }

    #[test]
    fn test_parse_response_groups() {
        let mut job1 = IppGroup::new(group::JOB);
        job1.attributes.push(IppAttribute::new("job-id", IppValue::Integer(12)));
        job1.attributes.push(IppAttribute::new("job-state", IppValue::Enum(5)));
        job1.attributes.push(IppAttribute::multi(
            "job-state-reasons",
            vec![
                IppValue::keyword("job-printing"),
                IppValue::keyword("cups-waiting-for-job-completed"),
            ],
        ));
        let mut job2 = IppGroup::new(group::JOB);
        job2.attributes.push(IppAttribute::new("job-id", IppValue::Integer(13)));

        let bytes = encode_response(
            status::SUCCESSFUL_OK,
            9,
            &[IppGroup::new(group::OPERATION), job1, job2],
        );
        let resp = IppResponse::parse(&bytes).unwrap();

        assert!(resp.is_success());
        assert_eq!(resp.version, (1, 1));
        assert_eq!(resp.request_id, 9);
        let jobs: Vec<_> = resp.groups_of(group::JOB).collect();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].value("job-id").and_then(IppValue::as_int), Some(12));
        assert_eq!(jobs[0].ints("job-state"), vec![5]);
        assert_eq!(
            jobs[0].strings("job-state-reasons"),
            vec!["job-printing", "cups-waiting-for-job-completed"]
        );
        assert!(jobs[1].get("job-state").is_none());
    }

    #[test]
    fn test_parse_text_with_language_and_out_of_band() {
        let mut g = IppGroup::new(group::OPERATION);
        let mut twl = Vec::new();
        put_bytes(&mut twl, b"en").unwrap();
        put_bytes(&mut twl, b"Not found").unwrap();
        g.attributes.push(IppAttribute::new(
            "status-message",
            IppValue::Other {
                tag: tag::TEXT_WITH_LANGUAGE,
                data: twl,
            },
        ));
        g.attributes
            .push(IppAttribute::new("printer-info", IppValue::OutOfBand(tag::NO_VALUE)));

        let bytes = encode_response(status::CLIENT_ERROR_NOT_FOUND, 1, &[g]);
        let resp = IppResponse::parse(&bytes).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.status_message(), Some("Not found"));
        assert_eq!(
            resp.groups[0].value("printer-info"),
            Some(&IppValue::OutOfBand(tag::NO_VALUE))
        );
    }

    #[test]
    fn test_parse_truncated() {
        assert_eq!(IppResponse::parse(&[0x01, 0x01, 0x00]), Err(IppError::Truncated(2)));

        let mut bytes = encode_response(status::SUCCESSFUL_OK, 1, &[]);
        bytes.pop();
        assert!(matches!(
            IppResponse::parse(&bytes),
            Err(IppError::Truncated(_))
        ));
    }

    #[test]
    fn test_parse_value_outside_group() {
        let mut bytes = vec![0x01, 0x01, 0x00, 0x00, 0, 0, 0, 1];
        IppAttribute::new("job-id", IppValue::Integer(1)).encode(&mut bytes).unwrap();
        bytes.push(group::END_OF_ATTRIBUTES);
        assert_eq!(IppResponse::parse(&bytes), Err(IppError::NoGroup(8)));
    }

    #[test]
    fn test_parse_bad_integer_length() {
        let mut bytes = vec![0x01, 0x01, 0x00, 0x00, 0, 0, 0, 1, group::JOB, tag::INTEGER];
        put_bytes(&mut bytes, b"job-id").unwrap();
        put_bytes(&mut bytes, &[0, 1]).unwrap();
        bytes.push(group::END_OF_ATTRIBUTES);
        assert_eq!(
            IppResponse::parse(&bytes),
            Err(IppError::BadLength {
                kind: "integer",
                len: 2
            })
        );
    }

    #[test]
    fn test_oversized_value_is_rejected() {
        let title = "é".repeat(40_000);
        let req = IppRequest::new(operation::PRINT_JOB, 3)
            .operation_attr(IppAttribute::new("job-name", IppValue::name(title)));
        assert_eq!(
            req.encode(),
            Err(IppError::ValueTooLong {
                attribute: "job-name".to_string(),
                len: 80_000
            })
        );

        let fits = IppRequest::new(operation::PRINT_JOB, 4).operation_attr(IppAttribute::new(
            "job-name",
            IppValue::name("x".repeat(u16::MAX as usize)),
        ));
        assert!(fits.encode().is_ok());
    }
}
