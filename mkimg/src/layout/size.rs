// SPDX-License-Identifier: MIT

use serde::{Deserialize, Deserializer};

/// Requested image size: a fixed partition or an unbounded initrd.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Size {
    Initrd,
    Fixed(u64),
}

impl Size {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            Size::Initrd => None,
            Size::Fixed(bytes) => Some(*bytes),
        }
    }
}

impl<'de> Deserialize<'de> for Size {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SizeVisitor;

        impl serde::de::Visitor<'_> for SizeVisitor {
            type Value = Size;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a size string like '512K', '8M', '1G' or 'initrd'")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value.trim().eq_ignore_ascii_case("initrd") {
                    return Ok(Size::Initrd);
                }
                parse_size(value).map(Size::Fixed).map_err(|_| {
                    E::custom(format!(
                        "Invalid size format '{value}'. Use K, M or G suffix, or 'initrd'."
                    ))
                })
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Size::Fixed(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(value)
                    .map(Size::Fixed)
                    .map_err(|_| E::custom("size must be positive"))
            }
        }

        deserializer.deserialize_any(SizeVisitor)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Size::Initrd => write!(f, "initrd"),
            Size::Fixed(bytes) => write!(f, "{}", crate::utils::pretty_bytes(*bytes)),
        }
    }
}

/// Parses `"512K"`, `"8M"`, `"1G"` or a plain byte count.
pub fn parse_size(size: &str) -> anyhow::Result<u64> {
    let lower = size.trim().to_lowercase();

    let (num, shift) = if let Some(num) = lower.strip_suffix('k') {
        (num, 10)
    } else if let Some(num) = lower.strip_suffix('m') {
        (num, 20)
    } else if let Some(num) = lower.strip_suffix('g') {
        (num, 30)
    } else {
        (lower.as_str(), 0)
    };
    let value: u64 = num.trim().parse()?;
    value
        .checked_mul(1 << shift)
        .ok_or_else(|| anyhow::anyhow!("Size '{size}' overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512K").unwrap(), 512 * 1024);
        assert_eq!(parse_size("8m").unwrap(), 8 << 20);
        assert_eq!(parse_size(" 1G ").unwrap(), 1 << 30);
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert!(parse_size("12X").is_err());
        assert!(parse_size("M").is_err());
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Doc {
            a: Size,
            b: Size,
            c: Size,
        }
        let doc: Doc = toml::from_str("a = '2M'\nb = 'initrd'\nc = 1024").unwrap();
        assert_eq!(doc.a, Size::Fixed(2 << 20));
        assert_eq!(doc.b, Size::Initrd);
        assert_eq!(doc.c, Size::Fixed(1024));
        assert!(toml::from_str::<Doc>("a = 'big'\nb = '1K'\nc = '1K'").is_err());
    }
}
