//! Typed pairing and control messages.
//!
//! Hand-annotated `prost::Message` structs rather than generated code: the
//! field numbers on both ports are non-contiguous (10/20/30/40 on the pairing
//! port, 1/2/8/9/10 on the control port) and must match the TV exactly, so
//! they are pinned at the definition site. Unknown inbound fields are skipped
//! by prost during decode.
//!
//! Two top-level messages exist, one per port:
//!
//! - [`PairingMessage`] — pairing port (6467). Every outbound message carries
//!   the `protocol_version`/`status` prefix; exactly one of the sub-message
//!   fields identifies the handshake step.
//! - [`RemoteMessage`] — control port (6466). Configure, ping, key injection.

/// Protocol version sent in every pairing message. Only v2 is spoken.
pub const PROTOCOL_VERSION: u32 = 2;

/// Pairing-message status codes.
pub mod status {
    /// Request or acknowledgement accepted.
    pub const OK: u32 = 200;
    /// The submitted pairing secret did not match.
    pub const BAD_SECRET: u32 = 402;
}

/// Encoding type for the displayed code: hexadecimal.
pub const ENCODING_TYPE_HEXADECIMAL: u32 = 3;

/// Number of symbols in the displayed code.
pub const ENCODING_SYMBOL_LENGTH: u32 = 6;

/// Client role: input device.
pub const ROLE_TYPE_INPUT: u32 = 1;

/// `code1` value sent in the initial control-port configure. The TV echoes
/// whatever it receives; the concrete value is immaterial.
pub const DEFAULT_CONFIGURE_CODE: u32 = 622;

/// Key-event direction: press.
pub const DIRECTION_PRESS: u32 = 1;

/// Key-event direction: release.
pub const DIRECTION_RELEASE: u32 = 2;

/// Device identification carried in pairing requests and configure messages.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct DeviceInfo {
    #[prost(string, tag = "1")]
    pub model: String,
    #[prost(string, tag = "2")]
    pub vendor: String,
    /// Always 1; meaning unknown, but the TV expects it.
    #[prost(uint32, tag = "3")]
    pub unknown1: u32,
    #[prost(string, tag = "4")]
    pub version: String,
    #[prost(string, tag = "5")]
    pub package_name: String,
    #[prost(string, tag = "6")]
    pub app_version: String,
}

impl DeviceInfo {
    /// Device info describing this client, as sent to the TV.
    pub fn for_client(model: &str) -> Self {
        Self {
            model: model.to_string(),
            vendor: "atvremote".to_string(),
            unknown1: 1,
            version: "1".to_string(),
            package_name: "atvremote".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Step 1 payload: identify the client to the TV.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PairingRequest {
    #[prost(string, tag = "1")]
    pub client_name: String,
    #[prost(string, tag = "2")]
    pub service_name: String,
    #[prost(message, optional, tag = "3")]
    pub device_info: Option<DeviceInfo>,
}

/// One supported code encoding: `(type, symbol_length)`.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PairingEncoding {
    #[prost(uint32, tag = "1")]
    pub encoding_type: u32,
    #[prost(uint32, tag = "2")]
    pub symbol_length: u32,
}

impl PairingEncoding {
    /// The six-symbol hexadecimal encoding this client speaks.
    pub fn hexadecimal() -> Self {
        Self {
            encoding_type: ENCODING_TYPE_HEXADECIMAL,
            symbol_length: ENCODING_SYMBOL_LENGTH,
        }
    }
}

/// Step 2 payload: advertise supported encodings and the preferred role.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PairingOptions {
    #[prost(message, repeated, tag = "1")]
    pub input_encodings: Vec<PairingEncoding>,
    #[prost(message, repeated, tag = "2")]
    pub output_encodings: Vec<PairingEncoding>,
    #[prost(uint32, tag = "3")]
    pub preferred_role: u32,
}

/// Step 3 payload: commit to one encoding and role.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PairingConfiguration {
    #[prost(message, optional, tag = "1")]
    pub encoding: Option<PairingEncoding>,
    #[prost(uint32, tag = "2")]
    pub client_role: u32,
}

/// Step 4 payload: the pairing-secret digest.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PairingSecret {
    #[prost(bytes = "vec", tag = "1")]
    pub secret: Vec<u8>,
}

/// Top-level message on the pairing port.
///
/// The spread-out field numbers are part of the wire contract:
/// `pairing_request` = 10 (first tag byte `0x52`), `options` = 20
/// (`0xA2 0x01`), `configuration` = 30 (`0xF2 0x01`), `secret` = 40
/// (`0xC2 0x02`).
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PairingMessage {
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    #[prost(uint32, tag = "2")]
    pub status: u32,
    #[prost(message, optional, tag = "10")]
    pub pairing_request: Option<PairingRequest>,
    #[prost(message, optional, tag = "20")]
    pub options: Option<PairingOptions>,
    #[prost(message, optional, tag = "30")]
    pub configuration: Option<PairingConfiguration>,
    #[prost(message, optional, tag = "40")]
    pub secret: Option<PairingSecret>,
}

impl PairingMessage {
    /// An outbound message skeleton: version 2, status 200, no payload.
    fn outbound() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            status: status::OK,
            ..Self::default()
        }
    }

    /// Step 1: pairing request naming this client.
    pub fn request(client_name: &str, service_name: &str) -> Self {
        Self {
            pairing_request: Some(PairingRequest {
                client_name: client_name.to_string(),
                service_name: service_name.to_string(),
                device_info: Some(DeviceInfo::for_client(client_name)),
            }),
            ..Self::outbound()
        }
    }

    /// Step 2: options advertising hexadecimal codes, input role.
    pub fn options() -> Self {
        Self {
            options: Some(PairingOptions {
                input_encodings: vec![PairingEncoding::hexadecimal()],
                output_encodings: Vec::new(),
                preferred_role: ROLE_TYPE_INPUT,
            }),
            ..Self::outbound()
        }
    }

    /// Step 3: configuration committing to hexadecimal codes, input role.
    pub fn configuration() -> Self {
        Self {
            configuration: Some(PairingConfiguration {
                encoding: Some(PairingEncoding::hexadecimal()),
                client_role: ROLE_TYPE_INPUT,
            }),
            ..Self::outbound()
        }
    }

    /// Step 4: the pairing secret digest.
    pub fn secret(secret: Vec<u8>) -> Self {
        Self {
            secret: Some(PairingSecret { secret }),
            ..Self::outbound()
        }
    }
}

/// Control-port configure payload; field 1 outbound, field 2 as the ack.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct RemoteConfigure {
    #[prost(uint32, tag = "1")]
    pub code1: u32,
    #[prost(message, optional, tag = "2")]
    pub device_info: Option<DeviceInfo>,
}

/// Keep-alive probe sent by the TV.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PingRequest {
    #[prost(uint32, tag = "1")]
    pub id: u32,
}

/// Keep-alive echo; must carry the id of the request it answers.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct PingResponse {
    #[prost(uint32, tag = "1")]
    pub id: u32,
}

/// A single key event: Android keycode plus press/release direction.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct RemoteKeyInject {
    #[prost(uint32, tag = "1")]
    pub keycode: u32,
    #[prost(uint32, tag = "2")]
    pub direction: u32,
}

/// Top-level message on the control port.
///
/// Field numbers: `remote_configure` = 1, `configure_ack` = 2,
/// `ping_request` = 8 (tag `0x42`), `ping_response` = 9 (`0x4A`),
/// `key_inject` = 10 (`0x52`).
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct RemoteMessage {
    #[prost(message, optional, tag = "1")]
    pub remote_configure: Option<RemoteConfigure>,
    #[prost(message, optional, tag = "2")]
    pub configure_ack: Option<RemoteConfigure>,
    #[prost(message, optional, tag = "8")]
    pub ping_request: Option<PingRequest>,
    #[prost(message, optional, tag = "9")]
    pub ping_response: Option<PingResponse>,
    #[prost(message, optional, tag = "10")]
    pub key_inject: Option<RemoteKeyInject>,
}

impl RemoteMessage {
    /// The initial configure sent as soon as the control TLS session is up.
    pub fn configure(code1: u32, device_info: DeviceInfo) -> Self {
        Self {
            remote_configure: Some(RemoteConfigure {
                code1,
                device_info: Some(device_info),
            }),
            ..Self::default()
        }
    }

    /// Acknowledge the TV's configure, echoing its `code1`.
    pub fn configure_ack(code1: u32) -> Self {
        Self {
            configure_ack: Some(RemoteConfigure {
                code1,
                device_info: None,
            }),
            ..Self::default()
        }
    }

    /// Echo a ping request.
    pub fn ping_response(id: u32) -> Self {
        Self {
            ping_response: Some(PingResponse { id }),
            ..Self::default()
        }
    }

    /// A key event.
    pub fn key_inject(keycode: u32, direction: u32) -> Self {
        Self {
            key_inject: Some(RemoteKeyInject { keycode, direction }),
            ..Self::default()
        }
    }
}
