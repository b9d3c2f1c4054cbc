//! Built-in filter/input pairs.

use serde_json::json;

use crate::transform::format_json;

/// A filter and the input it is meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub filter: &'static str,
    pub input: String,
}

/// The example loaded on request.
pub fn example() -> Sample {
    let input = json!({
        "items": [
            { "id": 1, "name": "Ada Lovelace" },
            { "id": 2, "name": "Grace Hopper" },
            { "id": 3, "name": "Alan Turing" },
        ]
    });
    Sample {
        filter: ".items[] | {id, name}",
        input: format_json(&input.to_string()),
    }
}

/// What an empty session starts with.
pub fn prefill() -> Sample {
    let input = json!({ "foo": 5, "bar": "baz" });
    Sample {
        filter: "[.foo, .bar]",
        input: format_json(&input.to_string()),
    }
}
