//! Strict decoding of plugin configuration sections.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::PluginError;

/// The raw configuration section of one plugin instance.
pub type PluginConfig = Map<String, Value>;

/// Decodes `config` into `T`.
///
/// Every key in `required` must be present, and every key in `config` must be
/// consumed while deserializing `T`. Keys serde skips are reported by path,
/// nested ones included (`responses.0.extra`).
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct RealNameConfig { channel: String }
///
/// let cfg: RealNameConfig = decode_config(&raw, &["channel"])?;
/// ```
pub fn decode_config<T>(config: &PluginConfig, required: &[&str]) -> Result<T, PluginError>
where
    T: DeserializeOwned,
{
    if let Some(missing) = required.iter().find(|key| !config.contains_key(**key)) {
        return Err(PluginError::MissingKey(missing.to_string()));
    }

    let mut unknown = Vec::new();
    let decoded: T = serde_ignored::deserialize(Value::Object(config.clone()), |path| {
        unknown.push(path.to_string());
    })
    .map_err(PluginError::Decode)?;

    if !unknown.is_empty() {
        return Err(PluginError::UnknownKeys(unknown));
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct PotatoConfig {
        timeout: u64,
        #[serde(default)]
        diversity_threshold: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct GreeterConfig {
        #[serde(alias = "chan")]
        channel: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        greeting: Option<String>,
        #[serde(default)]
        replies: Vec<Reply>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Reply {
        text: String,
    }

    fn raw(value: Value) -> PluginConfig {
        match value {
            Value::Object(map) => map,
            _ => panic!("config must be an object"),
        }
    }

    #[test]
    fn test_decode_valid_config() {
        let cfg: PotatoConfig =
            decode_config(&raw(json!({"timeout": 5, "diversity_threshold": 1.5})), &["timeout"])
                .unwrap();
        assert_eq!(cfg.timeout, 5);
        assert_eq!(cfg.diversity_threshold, Some(1.5));
    }

    #[test]
    fn test_missing_required_key() {
        let err = decode_config::<PotatoConfig>(
            &raw(json!({"timeout": 5})),
            &["timeout", "diversity_threshold"],
        )
        .unwrap_err();
        assert!(matches!(err, PluginError::MissingKey(ref k) if k == "diversity_threshold"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = decode_config::<PotatoConfig>(&raw(json!({"timeout": 5, "timout": 6})), &[])
            .unwrap_err();
        assert!(matches!(err, PluginError::UnknownKeys(ref keys) if keys == &["timout"]));
    }

    #[test]
    fn test_wrong_type_is_a_decode_error() {
        let err = decode_config::<PotatoConfig>(&raw(json!({"timeout": "soon"})), &[]).unwrap_err();
        assert!(matches!(err, PluginError::Decode(_)));
    }

    #[test]
    fn test_alias_key_is_consumed() {
        let cfg: GreeterConfig =
            decode_config(&raw(json!({"chan": "general"})), &[]).unwrap();
        assert_eq!(cfg.channel, "general");
    }

    #[test]
    fn test_null_option_is_consumed() {
        let cfg: GreeterConfig =
            decode_config(&raw(json!({"channel": "general", "greeting": null})), &["channel"])
                .unwrap();
        assert!(cfg.greeting.is_none());
    }

    #[test]
    fn test_nested_unknown_key_is_rejected() {
        let err = decode_config::<GreeterConfig>(
            &raw(json!({"channel": "general", "replies": [{"text": "hi", "emoji": "wave"}]})),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, PluginError::UnknownKeys(ref keys) if keys == &["replies.0.emoji"]));
    }
}
