use warden_discord::twilight_model::id::Id;

use crate::argument::{ArgumentDecl, ArgumentKind, ArgumentValue};

use warden_common::config::CUSTOM_ID_MAX_LENGTH;

/// Serializes a component identifier as `base_id(':' token)*`.
///
/// The platform rejects identifiers longer than 100 characters, so the
/// ceiling is enforced here, at encode time, where the offending values
/// are known. Exactly 100 characters is still valid.
pub fn encode(base_id: &str, values: &[ArgumentValue]) -> anyhow::Result<String> {
    let mut encoded = String::from(base_id);

    for (index, value) in values.iter().enumerate() {
        let token = match value {
            ArgumentValue::String(value) => {
                // A colon inside a non-final token would shift every
                // following token during decode.
                if index + 1 != values.len() && value.contains(':') {
                    anyhow::bail!(
                        "custom id {:?}: non-final string value {:?} contains ':'",
                        base_id,
                        value
                    );
                }
                value.clone()
            }
            ArgumentValue::Number(value) => value.to_string(),
            ArgumentValue::Boolean(value) => value.to_string(),
            ArgumentValue::UserId(id) => id.get().to_string(),
            other => anyhow::bail!(
                "custom id {:?}: value {:?} cannot be encoded into an identifier",
                base_id,
                other
            ),
        };

        encoded.push(':');
        encoded.push_str(&token);
    }

    if encoded.len() > CUSTOM_ID_MAX_LENGTH {
        anyhow::bail!(
            "custom id {:?} would be {} characters, exceeding the {}-character platform limit",
            base_id,
            encoded.len(),
            CUSTOM_ID_MAX_LENGTH
        );
    }

    Ok(encoded)
}

/// The base id of a raw identifier: everything before the first `:`.
pub fn base_id(raw: &str) -> &str {
    raw.split(':').next().unwrap_or(raw)
}

/// Re-parses an identifier against the declared parameter list.
///
/// A token-count mismatch means the identifier is stale or forged; the
/// error is expected to surface to the user, never to crash dispatch.
pub fn decode(raw: &str, decls: &[ArgumentDecl]) -> anyhow::Result<Vec<ArgumentValue>> {
    // One extra split slot so the final token may contain ':'.
    let mut tokens = raw.splitn(decls.len() + 1, ':');
    let base = tokens.next().unwrap_or_default();

    let tokens: Vec<&str> = tokens.collect();
    if tokens.len() != decls.len() {
        anyhow::bail!(
            "custom id {:?} carries {} values but {} are declared",
            base,
            tokens.len(),
            decls.len()
        );
    }

    let mut values = Vec::with_capacity(decls.len());
    for (token, decl) in tokens.iter().zip(decls) {
        let value = match &decl.kind {
            ArgumentKind::String { .. } => ArgumentValue::String((*token).to_string()),
            ArgumentKind::Number => ArgumentValue::Number(token.parse()?),
            ArgumentKind::Boolean => match *token {
                "true" => ArgumentValue::Boolean(true),
                "false" => ArgumentValue::Boolean(false),
                other => anyhow::bail!("expected a boolean token, got {:?}", other),
            },
            ArgumentKind::UserId => {
                let id = Id::new_checked(token.parse::<u64>()?)
                    .ok_or_else(|| anyhow::anyhow!("user id token must be non-zero"))?;
                ArgumentValue::UserId(id)
            }
            other => anyhow::bail!("kind {:?} cannot appear in a custom id", other),
        };
        values.push(value);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_discord::twilight_model::id::Id;

    fn decl(kind: ArgumentKind) -> ArgumentDecl {
        ArgumentDecl {
            title: "value".into(),
            description: String::new(),
            kind,
            required: true,
            autocomplete: None,
        }
    }

    #[test]
    fn round_trips_every_encodable_kind() {
        let decls = vec![
            decl(ArgumentKind::plain_string()),
            decl(ArgumentKind::Number),
            decl(ArgumentKind::Boolean),
            decl(ArgumentKind::UserId),
        ];
        let values = vec![
            ArgumentValue::String("warn".into()),
            ArgumentValue::Number(42),
            ArgumentValue::Boolean(true),
            ArgumentValue::UserId(Id::new(1034123502868275691)),
        ];

        let raw = encode("case", &values).unwrap();
        assert_eq!(raw, "case:warn:42:true:1034123502868275691");
        assert_eq!(base_id(&raw), "case");

        let decoded = decode(&raw, &decls).unwrap();
        assert_eq!(decoded.len(), 4);
        assert!(matches!(&decoded[0], ArgumentValue::String(s) if s == "warn"));
        assert!(matches!(decoded[1], ArgumentValue::Number(42)));
        assert!(matches!(decoded[2], ArgumentValue::Boolean(true)));
        assert!(
            matches!(decoded[3], ArgumentValue::UserId(id) if id == Id::new(1034123502868275691))
        );
    }

    #[test]
    fn round_trips_with_no_values() {
        let raw = encode("refresh", &[]).unwrap();
        assert_eq!(raw, "refresh");
        assert!(decode(&raw, &[]).unwrap().is_empty());
    }

    #[test]
    fn final_token_may_contain_colons() {
        let decls = vec![decl(ArgumentKind::Number), decl(ArgumentKind::plain_string())];
        let values = vec![
            ArgumentValue::Number(3),
            ArgumentValue::String("a:b:c".into()),
        ];

        let raw = encode("note", &values).unwrap();
        let decoded = decode(&raw, &decls).unwrap();
        assert!(matches!(&decoded[1], ArgumentValue::String(s) if s == "a:b:c"));
    }

    #[test]
    fn rejects_colons_in_non_final_strings() {
        let values = vec![
            ArgumentValue::String("a:b".into()),
            ArgumentValue::Number(1),
        ];
        assert!(encode("note", &values).is_err());
    }

    #[test]
    fn enforces_the_length_ceiling() {
        let base = "x".repeat(90);
        // 90 + 1 + 9 == 100: allowed.
        let ok = encode(&base, &[ArgumentValue::String("y".repeat(9))]).unwrap();
        assert_eq!(ok.len(), 100);

        // 101 characters: rejected with the base id in the message.
        let err = encode(&base, &[ArgumentValue::String("y".repeat(10))]).unwrap_err();
        assert!(err.to_string().contains("101"));
    }

    #[test]
    fn decode_rejects_arity_mismatch() {
        let decls = vec![decl(ArgumentKind::Number), decl(ArgumentKind::Number)];
        assert!(decode("case:1", &decls).is_err());
        assert!(decode("case", &decls).is_err());
    }

    #[test]
    fn decode_rejects_malformed_tokens() {
        let decls = vec![decl(ArgumentKind::Number)];
        assert!(decode("case:notanumber", &decls).is_err());

        let decls = vec![decl(ArgumentKind::Boolean)];
        assert!(decode("case:yes", &decls).is_err());
    }
}
