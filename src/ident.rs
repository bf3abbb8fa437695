use crate::known_errors::KnownErrors;
use cuid::{Cuid2Constructor, cuid2_slug, is_cuid2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cuid {
    Cuid10([u8; 10]),
    Cuid16([u8; 16]),
}

impl Cuid {
    pub fn new10() -> Self {
        Self::Cuid10(
            cuid2_slug()
                .as_bytes()
                .try_into()
                .expect("failed to generate new cuid10"),
        )
    }
    pub fn new16() -> Self {
        Self::Cuid16(
            Cuid2Constructor::new()
                .with_length(16)
                .create_id()
                .as_bytes()
                .try_into()
                .expect("failed to generate new cuid16"),
        )
    }

    pub fn as_str(&self) -> &str {
        let bytes: &[u8] = match self {
            Cuid::Cuid10(id) => id.as_ref(),
            Cuid::Cuid16(id) => id.as_ref(),
        };
        // ids are only constructed from cuid2 output or validated strings
        str::from_utf8(bytes).expect("cuid bytes are always valid utf-8")
    }

    pub fn len(&self) -> usize {
        match self {
            Cuid::Cuid10(_) => 10,
            Cuid::Cuid16(_) => 16,
        }
    }
}

impl FromStr for Cuid {
    type Err = KnownErrors;
    fn from_str(s: &str) -> Result<Self, KnownErrors> {
        if !is_cuid2(s) {
            return Err(KnownErrors::InvalidId);
        }
        match s.len() {
            10 => Ok(Self::Cuid10(
                s.as_bytes().try_into().map_err(|_| KnownErrors::InvalidId)?,
            )),
            16 => Ok(Self::Cuid16(
                s.as_bytes().try_into().map_err(|_| KnownErrors::InvalidId)?,
            )),
            _ => Err(KnownErrors::InvalidId),
        }
    }
}

impl fmt::Display for Cuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Cuid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Cuid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Defines a cuid-backed identifier newtype with a fixed length.
macro_rules! id {
    ($name:ident, $ctor:path, $len:literal) => {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Cuid);

        impl $name {
            pub fn new() -> Self {
                Self($ctor())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::str::FromStr for $name {
            type Err = KnownErrors;
            fn from_str(s: &str) -> Result<Self, KnownErrors> {
                let id = Cuid::from_str(s)?;
                if id.len() != $len {
                    return Err(KnownErrors::InvalidId);
                }
                Ok(Self(id))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id!(AccountId, Cuid::new16, 16);
id!(ArticleId, Cuid::new10, 10);
