//! MeCom wire constants

/// Start marker of a request frame sent by the host
pub const REQUEST_MARKER: char = '#';

/// Start marker of a reply frame sent by a device
pub const REPLY_MARKER: char = '!';

/// Frame terminator (CR, no LF)
pub const TERMINATOR: char = '\r';

/// Width of the device address field
pub const ADDRESS_WIDTH: usize = 2;

/// Width of the sequence number field
pub const SEQUENCE_WIDTH: usize = 4;

/// Width of the checksum field
pub const CHECKSUM_WIDTH: usize = 4;

/// Width of a parameter id field
pub const PARAM_ID_WIDTH: usize = 4;

/// Width of a parameter instance field
pub const INSTANCE_WIDTH: usize = 2;

/// Width of an encoded value (float or int)
pub const VALUE_WIDTH: usize = 8;

/// Offset of the first payload character (marker + address + sequence)
pub const PAYLOAD_OFFSET: usize = 1 + ADDRESS_WIDTH + SEQUENCE_WIDTH;

/// Length of the trailer (checksum + terminator)
pub const TRAILER_LEN: usize = CHECKSUM_WIDTH + 1;

/// Shortest well-formed frame: marker, address, sequence, checksum, terminator
pub const MIN_FRAME_LEN: usize = PAYLOAD_OFFSET + TRAILER_LEN;

/// Largest frame a transport will accumulate before giving up
pub const MAX_FRAME_LEN: usize = 128;

/// Highest valid device address (0 is broadcast)
pub const MAX_DEVICE_ADDRESS: i64 = 0xFF;

/// Highest valid sequence number
pub const MAX_SEQUENCE_NUMBER: i64 = 0xFFFF;

/// Command code: set value
pub const CMD_SET_VALUE: &str = "VS";

/// Command code: read value
pub const CMD_READ_VALUE: &str = "?VR";

/// Command code: reset device
pub const CMD_RESET: &str = "RS";

/// Prefix of a device error payload (`+XX`)
pub const DEVICE_ERROR_PREFIX: char = '+';
