//! Operation, response, property and container codes
//!
//! Only the codes this bridge actually issues or interprets are listed.

/// Standard and vendor operation codes
pub mod operation {
    pub const GET_DEVICE_INFO: u16 = 0x1001;
    pub const OPEN_SESSION: u16 = 0x1002;
    pub const CLOSE_SESSION: u16 = 0x1003;
    pub const GET_DEVICE_PROP_DESC: u16 = 0x1014;
    pub const GET_DEVICE_PROP_VALUE: u16 = 0x1015;
    pub const SET_DEVICE_PROP_VALUE: u16 = 0x1016;

    /// Vendor operation: push a config or firmware object (write data phase)
    pub const SEND_CONFIG_OBJECT: u16 = 0x99A3;
    /// Vendor operation: pull the config object (read data phase)
    pub const GET_CONFIG_OBJECT: u16 = 0x99A4;
}

/// Response codes
pub mod response {
    pub const OK: u16 = 0x2001;
    pub const GENERAL_ERROR: u16 = 0x2002;
    pub const SESSION_NOT_OPEN: u16 = 0x2003;
    pub const OPERATION_NOT_SUPPORTED: u16 = 0x2005;
    pub const DEVICE_PROP_NOT_SUPPORTED: u16 = 0x200A;
    pub const INVALID_DEVICE_PROP_VALUE: u16 = 0x201C;
    pub const SESSION_ALREADY_OPEN: u16 = 0x201E;
}

/// Device property codes referenced by the built-in registry
pub mod property {
    pub const WHITE_BALANCE: u16 = 0x5005;
    pub const EXPOSURE_BIAS_COMPENSATION: u16 = 0x5010;
}

/// Event codes reported by devices
pub mod event {
    pub const OBJECT_ADDED: u16 = 0x4002;
    pub const DEVICE_PROP_CHANGED: u16 = 0x4006;
    pub const DEVICE_INFO_CHANGED: u16 = 0x4008;
    pub const STORE_FULL: u16 = 0x400A;
    pub const STORAGE_INFO_CHANGED: u16 = 0x400C;
    pub const CAPTURE_COMPLETE: u16 = 0x400D;
}

/// USB container kinds
pub mod container {
    pub const COMMAND: u16 = 0x0001;
    pub const DATA: u16 = 0x0002;
    pub const RESPONSE: u16 = 0x0003;
    pub const EVENT: u16 = 0x0004;
}

/// Form flags inside a DevicePropDesc dataset
pub mod form {
    pub const NONE: u8 = 0x00;
    pub const RANGE: u8 = 0x01;
    pub const ENUMERATION: u8 = 0x02;
}
