//! RADIUS packet codec (RFC 2865 framing, RFC 5176 / RFC 5997 authenticators).

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};

type HmacMd5 = Hmac<Md5>;

pub const HEADER_LENGTH: usize = 20;
pub const MAX_PACKET_LENGTH: usize = 4096;
const AUTHENTICATOR_LENGTH: usize = 16;
const MAX_ATTRIBUTE_VALUE: usize = 253;

pub mod code {
    pub const ACCESS_ACCEPT: u8 = 2;
    pub const ACCESS_REJECT: u8 = 3;
    pub const STATUS_SERVER: u8 = 12;
    pub const DISCONNECT_REQUEST: u8 = 40;
    pub const DISCONNECT_ACK: u8 = 41;
    pub const DISCONNECT_NAK: u8 = 42;
    pub const COA_REQUEST: u8 = 43;
    pub const COA_ACK: u8 = 44;
    pub const COA_NAK: u8 = 45;
}

pub mod attr {
    pub const USER_NAME: u8 = 1;
    pub const VENDOR_SPECIFIC: u8 = 26;
    pub const MESSAGE_AUTHENTICATOR: u8 = 80;
    pub const ERROR_CAUSE: u8 = 101;
}

pub const VENDOR_MIKROTIK: u32 = 14988;
pub const MIKROTIK_RATE_LIMIT: u8 = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RadiusError {
    #[error("packet is {0} bytes, shorter than the RADIUS header")]
    TooShort(usize),

    #[error("length field says {declared} bytes but {actual} were received")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("packet would exceed {MAX_PACKET_LENGTH} bytes")]
    TooLarge,

    #[error("attribute {0} value is longer than 253 bytes")]
    AttributeTooLong(u8),

    #[error("malformed attribute at offset {0}")]
    MalformedAttribute(usize),

    #[error("response authenticator does not match the shared secret")]
    BadAuthenticator,

    #[error("Message-Authenticator does not match the shared secret")]
    BadMessageAuthenticator,

    #[error("shared secret cannot key HMAC-MD5")]
    InvalidSecret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub kind: u8,
    pub value: Vec<u8>,
}

/// A decoded or to-be-encoded RADIUS packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub code: u8,
    pub identifier: u8,
    pub authenticator: [u8; AUTHENTICATOR_LENGTH],
    pub attributes: Vec<Attribute>,
}

impl Packet {
    pub fn new(code: u8, identifier: u8) -> Self {
        Self {
            code,
            identifier,
            authenticator: [0; AUTHENTICATOR_LENGTH],
            attributes: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: u8, value: impl Into<Vec<u8>>) -> Result<(), RadiusError> {
        let value = value.into();
        if value.len() > MAX_ATTRIBUTE_VALUE {
            return Err(RadiusError::AttributeTooLong(kind));
        }
        self.attributes.push(Attribute { kind, value });
        Ok(())
    }

    pub fn with(mut self, kind: u8, value: impl Into<Vec<u8>>) -> Result<Self, RadiusError> {
        self.push(kind, value)?;
        Ok(self)
    }

    /// Append a Vendor-Specific attribute holding one sub-attribute.
    pub fn push_vendor(&mut self, vendor_id: u32, vendor_type: u8, value: &[u8]) -> Result<(), RadiusError> {
        if value.len() + 2 > MAX_ATTRIBUTE_VALUE - 4 {
            return Err(RadiusError::AttributeTooLong(attr::VENDOR_SPECIFIC));
        }
        let mut vsa = Vec::with_capacity(6 + value.len());
        vsa.extend_from_slice(&vendor_id.to_be_bytes());
        vsa.push(vendor_type);
        vsa.push((value.len() + 2) as u8);
        vsa.extend_from_slice(value);
        self.push(attr::VENDOR_SPECIFIC, vsa)
    }

    pub fn attribute(&self, kind: u8) -> Option<&[u8]> {
        self.attributes
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.value.as_slice())
    }

    /// First value of a vendor sub-attribute.
    pub fn vendor_attribute(&self, vendor_id: u32, vendor_type: u8) -> Option<&[u8]> {
        self.attributes
            .iter()
            .filter(|a| a.kind == attr::VENDOR_SPECIFIC && a.value.len() >= 6)
            .find(|a| a.value[..4] == vendor_id.to_be_bytes() && a.value[4] == vendor_type)
            .map(|a| &a.value[6..])
    }

    /// Error-Cause (RFC 5176), when present and well formed.
    pub fn error_cause(&self) -> Option<u32> {
        let value = self.attribute(attr::ERROR_CAUSE)?;
        let bytes: [u8; 4] = value.try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    pub fn encode(&self) -> Result<Vec<u8>, RadiusError> {
        let length = HEADER_LENGTH
            + self
                .attributes
                .iter()
                .map(|a| a.value.len() + 2)
                .sum::<usize>();
        if length > MAX_PACKET_LENGTH {
            return Err(RadiusError::TooLarge);
        }

        let mut buf = Vec::with_capacity(length);
        buf.push(self.code);
        buf.push(self.identifier);
        buf.extend_from_slice(&(length as u16).to_be_bytes());
        buf.extend_from_slice(&self.authenticator);
        for attribute in &self.attributes {
            buf.push(attribute.kind);
            buf.push((attribute.value.len() + 2) as u8);
            buf.extend_from_slice(&attribute.value);
        }
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RadiusError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(RadiusError::TooShort(bytes.len()));
        }
        let declared = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if declared < HEADER_LENGTH || declared > bytes.len() || declared > MAX_PACKET_LENGTH {
            return Err(RadiusError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }

        let mut authenticator = [0u8; AUTHENTICATOR_LENGTH];
        authenticator.copy_from_slice(&bytes[4..HEADER_LENGTH]);

        // Octets past the length field are padding and ignored.
        let mut attributes = Vec::new();
        let mut offset = HEADER_LENGTH;
        while offset < declared {
            if offset + 2 > declared {
                return Err(RadiusError::MalformedAttribute(offset));
            }
            let kind = bytes[offset];
            let len = bytes[offset + 1] as usize;
            if len < 2 || offset + len > declared {
                return Err(RadiusError::MalformedAttribute(offset));
            }
            attributes.push(Attribute {
                kind,
                value: bytes[offset + 2..offset + len].to_vec(),
            });
            offset += len;
        }

        Ok(Self {
            code: bytes[0],
            identifier: bytes[1],
            authenticator,
            attributes,
        })
    }
}

// ---------------------------------------------------------------------------
// Authenticators
// ---------------------------------------------------------------------------

fn md5_digest(parts: &[&[u8]]) -> [u8; AUTHENTICATOR_LENGTH] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; AUTHENTICATOR_LENGTH];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

fn hmac_md5(secret: &[u8], data: &[u8]) -> Result<[u8; AUTHENTICATOR_LENGTH], RadiusError> {
    let mut mac =
        <HmacMd5 as Mac>::new_from_slice(secret).map_err(|_| RadiusError::InvalidSecret)?;
    mac.update(data);
    let mut signature = [0u8; AUTHENTICATOR_LENGTH];
    signature.copy_from_slice(&mac.finalize().into_bytes());
    Ok(signature)
}

/// Encode a Status-Server request: random Request Authenticator plus a
/// Message-Authenticator over the whole packet (RFC 5997 §3).
pub fn encode_status_server(
    identifier: u8,
    request_authenticator: [u8; AUTHENTICATOR_LENGTH],
    secret: &[u8],
) -> Result<Vec<u8>, RadiusError> {
    let mut packet = Packet::new(code::STATUS_SERVER, identifier);
    packet.authenticator = request_authenticator;
    packet.push(attr::MESSAGE_AUTHENTICATOR, vec![0u8; AUTHENTICATOR_LENGTH])?;

    let mut bytes = packet.encode()?;
    let signature = hmac_md5(secret, &bytes)?;
    let start = bytes.len() - AUTHENTICATOR_LENGTH;
    bytes[start..].copy_from_slice(&signature);
    Ok(bytes)
}

/// Encode a CoA or Disconnect request. The Request Authenticator is
/// `MD5(Code | Identifier | Length | 16 zero octets | Attributes | Secret)`
/// (RFC 5176 §2.3).
pub fn encode_dynamic_request(packet: &Packet, secret: &[u8]) -> Result<Vec<u8>, RadiusError> {
    let mut zeroed = packet.clone();
    zeroed.authenticator = [0; AUTHENTICATOR_LENGTH];
    let mut bytes = zeroed.encode()?;
    let authenticator = md5_digest(&[&bytes[..], secret]);
    bytes[4..HEADER_LENGTH].copy_from_slice(&authenticator);
    Ok(bytes)
}

/// Check a response against the request authenticator it answers:
/// `MD5(Code | Identifier | Length | RequestAuth | Attributes | Secret)`,
/// plus the Message-Authenticator when the response carries one.
pub fn verify_response(
    response: &[u8],
    request_authenticator: &[u8; AUTHENTICATOR_LENGTH],
    secret: &[u8],
) -> Result<(), RadiusError> {
    let packet = Packet::decode(response)?;
    let declared = u16::from_be_bytes([response[2], response[3]]) as usize;
    let response = &response[..declared];

    let mut substituted = response.to_vec();
    substituted[4..HEADER_LENGTH].copy_from_slice(request_authenticator);
    let expected = md5_digest(&[&substituted[..], secret]);
    if expected != packet.authenticator {
        return Err(RadiusError::BadAuthenticator);
    }

    if let Some(offset) = message_authenticator_offset(&substituted) {
        let received: [u8; AUTHENTICATOR_LENGTH] = substituted[offset..offset + AUTHENTICATOR_LENGTH]
            .try_into()
            .map_err(|_| RadiusError::MalformedAttribute(offset))?;
        substituted[offset..offset + AUTHENTICATOR_LENGTH].fill(0);
        if hmac_md5(secret, &substituted)? != received {
            return Err(RadiusError::BadMessageAuthenticator);
        }
    }
    Ok(())
}

/// Sign a response to `request_authenticator`; used by responders.
pub fn encode_response(
    packet: &Packet,
    request_authenticator: &[u8; AUTHENTICATOR_LENGTH],
    secret: &[u8],
) -> Result<Vec<u8>, RadiusError> {
    let mut unsigned = packet.clone();
    unsigned.authenticator = *request_authenticator;
    let mut bytes = unsigned.encode()?;
    let authenticator = md5_digest(&[&bytes[..], secret]);
    bytes[4..HEADER_LENGTH].copy_from_slice(&authenticator);
    Ok(bytes)
}

/// Offset of the Message-Authenticator value within an encoded packet.
fn message_authenticator_offset(bytes: &[u8]) -> Option<usize> {
    let mut offset = HEADER_LENGTH;
    while offset + 2 <= bytes.len() {
        let kind = bytes[offset];
        let len = bytes[offset + 1] as usize;
        if len < 2 {
            return None;
        }
        if kind == attr::MESSAGE_AUTHENTICATOR && len == AUTHENTICATOR_LENGTH + 2 {
            return Some(offset + 2);
        }
        offset += len;
    }
    None
}
