//! H.264 profile-level-id handling
//!
//! Negotiation compares H.264 offers by their `profile-level-id`, which is
//! three bytes written as six hex digits in the fmtp line:
//!
//! ```text
//! +-------------+---------------------+-----------+
//! | profile_idc | constraint flags    | level_idc |
//! |  (1 byte)   | (profile-iop, byte) | (1 byte)  |
//! +-------------+---------------------+-----------+
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parsed `profile-level-id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileLevelId {
    /// 66=Baseline, 77=Main, 100=High, ...
    pub profile_idc: u8,
    /// constraint_set flags
    pub profile_iop: u8,
    /// e.g. 31 = 3.1
    pub level_idc: u8,
}

impl ProfileLevelId {
    pub fn new(profile_idc: u8, profile_iop: u8, level_idc: u8) -> Self {
        Self {
            profile_idc,
            profile_iop,
            level_idc,
        }
    }
}

impl FromStr for ProfileLevelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 6 || !s.is_ascii() {
            return Err(Error::Protocol(format!("bad profile-level-id: {}", s)));
        }

        let byte = |i: usize| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| Error::Protocol(format!("bad profile-level-id: {}", s)))
        };

        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
    }
}

impl fmt::Display for ProfileLevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}",
            self.profile_idc, self.profile_iop, self.level_idc
        )
    }
}
