//! Episode serialization helpers.
//!
//! The format is a JSON list of steps. Loading separates two failure modes:
//! a document that is not JSON at all is a `Serialization` error, while a
//! step that parses but does not have the expected shape is a
//! `SchemaMismatch` naming the step.

use serde_json::Value as Json;

use crate::error::{ArbiterResult, EpisodeError};

use super::{Episode, EpisodeStep};

/// Serialize an episode to pretty JSON.
pub fn to_json_pretty(episode: &Episode) -> ArbiterResult<String> {
    serde_json::to_string_pretty(episode).map_err(|e| {
        EpisodeError::Serialization {
            message: format!("serialize episode: {e}"),
        }
        .into()
    })
}

/// Deserialize an episode from JSON.
pub fn from_json(s: &str) -> ArbiterResult<Episode> {
    let doc: Json = serde_json::from_str(s).map_err(|e| EpisodeError::Serialization {
        message: format!("deserialize episode: {e}"),
    })?;

    let Json::Array(items) = doc else {
        return Err(EpisodeError::Serialization {
            message: "deserialize episode: expected a list of steps".to_string(),
        }
        .into());
    };

    let mut episode = Episode::new();
    for (index, item) in items.into_iter().enumerate() {
        let step: EpisodeStep =
            serde_json::from_value(item).map_err(|e| EpisodeError::schema(index, e.to_string()))?;
        episode.add(step);
    }
    Ok(episode)
}
