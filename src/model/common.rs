use schemars::JsonSchema;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CourseId = String;

/// A relative path on the remote host naming one retrievable unit of work.
///
/// Normalized on construction so the same physical target reached through
/// two listing pages compares equal: surrounding whitespace and quotes and
/// any leading `/` are removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchTarget(String);

impl FetchTarget {
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = raw.trim().trim_matches('"').trim().trim_start_matches('/');
        if normalized.is_empty() {
            None
        } else {
            Some(FetchTarget(normalized.to_string()))
        }
    }

    /// For paths this crate builds itself; an empty path addresses the root.
    pub fn from_path(path: &str) -> Self {
        Self::new(path).unwrap_or_else(|| FetchTarget(String::new()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FetchTarget {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn section_from_url(url: &str) -> Option<&str> {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() >= 4 {
        parts.last().copied().filter(|s| !s.is_empty())
    } else {
        None
    }
}

/// Accepts ints, floats, numeric strings and null; anything unreadable is 0.
pub fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlexibleF64Visitor;
    impl<'de> Visitor<'de> for FlexibleF64Visitor {
        type Value = f64;
        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("number, numeric string, or null")
        }
        #[inline]
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }
        #[inline]
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }
        #[inline]
        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(if v.is_finite() { v } else { 0.0 })
        }
        #[inline]
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0))
        }
        #[inline]
        fn visit_bool<E>(self, _v: bool) -> Result<Self::Value, E> {
            Ok(0.0)
        }
        #[inline]
        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }
        #[inline]
        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }
        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<de::IgnoredAny>()?.is_some() {}
            Ok(0.0)
        }
        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            while map
                .next_entry::<de::IgnoredAny, de::IgnoredAny>()?
                .is_some()
            {}
            Ok(0.0)
        }
    }
    deserializer.deserialize_any(FlexibleF64Visitor)
}

/// Strings pass through, numbers are stringified, null becomes empty.
pub fn deserialize_string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrDefaultVisitor;

    impl<'de> Visitor<'de> for StringOrDefaultVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string, number, or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
            Ok(value.to_string())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<de::IgnoredAny>()?.is_some() {}
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(StringOrDefaultVisitor)
}

pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = deserialize_string_or_default(deserializer)?;
    Ok(Some(v).filter(|s| !s.trim().is_empty()))
}

/// Per-weekday meeting flags, serialized flat as `lecture_<day>` keys.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
pub struct WeekdayFlags {
    #[serde(rename = "lecture_sunday", default)]
    pub sunday: bool,
    #[serde(rename = "lecture_monday", default)]
    pub monday: bool,
    #[serde(rename = "lecture_tuesday", default)]
    pub tuesday: bool,
    #[serde(rename = "lecture_wednesday", default)]
    pub wednesday: bool,
    #[serde(rename = "lecture_thursday", default)]
    pub thursday: bool,
    #[serde(rename = "lecture_friday", default)]
    pub friday: bool,
    #[serde(rename = "lecture_saturday", default)]
    pub saturday: bool,
}

impl WeekdayFlags {
    /// Sets the flag for a day name such as `"Monday"`; unknown names are ignored.
    pub fn set(&mut self, day: &str) -> bool {
        let slot = match day.trim().to_lowercase().as_str() {
            "sunday" => &mut self.sunday,
            "monday" => &mut self.monday,
            "tuesday" => &mut self.tuesday,
            "wednesday" => &mut self.wednesday,
            "thursday" => &mut self.thursday,
            "friday" => &mut self.friday,
            "saturday" => &mut self.saturday,
            _ => return false,
        };
        *slot = true;
        true
    }
}
