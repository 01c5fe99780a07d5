/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

/// Serialize durations to/from f64 number of seconds. Poll intervals,
/// backoffs and wait limits are written by hand in config files, where
/// `10` or `0.5` reads better than a `{ secs, nanos }` struct. Negative
/// and non-finite values are rejected on input.
use serde::{de, ser};
use std::fmt;
use std::time::Duration;

struct Visitor;

pub fn serialize<S>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: ser::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_f64(Visitor)
}

impl<'de> de::Visitor<'de> for Visitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a non-negative duration in seconds")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Duration, E> {
        Duration::try_from_secs_f64(value)
            .map_err(|_| E::invalid_value(de::Unexpected::Float(value), &self))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Duration, E> {
        u64::try_from(value).map(Duration::from_secs).map_err(|_| {
            E::invalid_value(de::Unexpected::Signed(value), &self)
        })
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Duration, E> {
        Ok(Duration::from_secs(value))
    }
}

/// Same as the parent module, for optional durations (`null` or absent
/// means "no limit").
pub mod option {
    use serde::{de, ser, Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Wrapper(#[serde(with = "super")] Duration);

    pub fn serialize<S>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        duration.map(Wrapper).serialize(serializer)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(d)| d))
    }
}
