//! MQTT topic filters and their Zenoh key expression equivalents.
//!
//! Zenoh's MQTT bridge maps every MQTT topic 1:1 onto a key expression, so a
//! subscription can be written in familiar MQTT syntax and translated:
//!
//! | MQTT | Zenoh |
//! |------|-------|
//! | `#`  | `**`  |
//! | `+`  | `*`   |

use std::fmt;

use crate::error::{Error, Result};

/// A validated MQTT topic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    filter: String,
    key_expr: String,
}

impl TopicFilter {
    /// Parse and validate an MQTT topic filter.
    ///
    /// # Example
    /// ```
    /// use mqtt_exporter_common::TopicFilter;
    ///
    /// let filter = TopicFilter::parse("esphome/+/+/state").unwrap();
    /// assert_eq!(filter.key_expr(), "esphome/*/*/state");
    /// ```
    pub fn parse(filter: &str) -> Result<Self> {
        if filter.is_empty() {
            return Err(Error::topic(filter, "filter is empty"));
        }

        let levels: Vec<&str> = filter.split('/').collect();
        let mut chunks = Vec::with_capacity(levels.len());

        for (i, level) in levels.iter().enumerate() {
            let chunk = match *level {
                "" => return Err(Error::topic(filter, "empty topic level")),
                "#" if i + 1 == levels.len() => "**",
                "#" => return Err(Error::topic(filter, "'#' must be the last level")),
                "+" => "*",
                other if other.contains(['#', '+']) => {
                    return Err(Error::topic(
                        filter,
                        "wildcards must occupy a whole topic level",
                    ));
                }
                other if other.contains(['*', '$', '?']) => {
                    return Err(Error::topic(
                        filter,
                        "level is not representable as a Zenoh key expression",
                    ));
                }
                other => other,
            };
            chunks.push(chunk);
        }

        Ok(Self {
            filter: filter.to_string(),
            key_expr: chunks.join("/"),
        })
    }

    /// The filter as written in MQTT syntax.
    pub fn as_str(&self) -> &str {
        &self.filter
    }

    /// The equivalent Zenoh key expression.
    pub fn key_expr(&self) -> &str {
        &self.key_expr
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filter)
    }
}
