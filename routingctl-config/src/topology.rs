//! Textual topology expressions (§4.3 step 2) compiled to
//! [`routingctl_core::registry::Topology`] token lists.
//!
//! The wire spec only names the token alphabet (SOURCE, SINK, GATEWAY,
//! LBRACKET, RBRACKET, ASTERISK); it leaves the surface syntax to the
//! implementer. We use a small prefixed-token grammar, one token per
//! whitespace-separated word:
//!
//! ```text
//! src:Media snk:Speaker              // a direct hop
//! src:Phone [ gw:Amp ] snk:Earpiece  // an optional gateway hop
//! src:* snk:Speaker                  // matches any already-registered source
//! ```
//!
//! `[` / `]` stand alone as their own words; everything else is
//! `kind:name`, where `name` is either an identifier or `*`.

use routingctl_core::registry::{ElementName, Topology, TopologyToken};

use crate::error::ConfigError;

pub fn parse_topology(expr: &str) -> Result<Topology, ConfigError> {
    let mut tokens = Vec::new();
    for word in expr.split_whitespace() {
        tokens.push(parse_token(expr, word)?);
    }
    if tokens.is_empty() {
        return Err(ConfigError::Topology {
            expr: expr.to_string(),
            reason: "empty topology expression".to_string(),
        });
    }
    Ok(Topology { tokens })
}

fn parse_token(expr: &str, word: &str) -> Result<TopologyToken, ConfigError> {
    match word {
        "[" => return Ok(TopologyToken::LBracket),
        "]" => return Ok(TopologyToken::RBracket),
        _ => {}
    }

    let (kind, name) = word.split_once(':').ok_or_else(|| ConfigError::Topology {
        expr: expr.to_string(),
        reason: format!("expected 'kind:name', '[' or ']', got '{word}'"),
    })?;
    let element = if name == "*" {
        ElementName::Wildcard
    } else {
        ElementName::Named(name.to_string())
    };

    match kind {
        "src" => Ok(TopologyToken::Source(element)),
        "snk" => Ok(TopologyToken::Sink(element)),
        "gw" => Ok(TopologyToken::Gateway(element)),
        other => Err(ConfigError::Topology {
            expr: expr.to_string(),
            reason: format!("unknown token kind '{other}', expected src/snk/gw"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_direct_hop() {
        let topology = parse_topology("src:Media snk:Speaker").unwrap();
        assert_eq!(
            topology.tokens,
            vec![
                TopologyToken::Source(ElementName::Named("Media".to_string())),
                TopologyToken::Sink(ElementName::Named("Speaker".to_string())),
            ]
        );
    }

    #[test]
    fn parses_wildcards_and_brackets() {
        let topology = parse_topology("src:* [ gw:Amp ] snk:Speaker").unwrap();
        assert_eq!(
            topology.tokens,
            vec![
                TopologyToken::Source(ElementName::Wildcard),
                TopologyToken::LBracket,
                TopologyToken::Gateway(ElementName::Named("Amp".to_string())),
                TopologyToken::RBracket,
                TopologyToken::Sink(ElementName::Named("Speaker".to_string())),
            ]
        );
    }

    #[test]
    fn rejects_unknown_token_kind() {
        let err = parse_topology("foo:Bar").unwrap_err();
        assert!(matches!(err, ConfigError::Topology { .. }));
    }

    #[test]
    fn rejects_empty_expression() {
        let err = parse_topology("   ").unwrap_err();
        assert!(matches!(err, ConfigError::Topology { .. }));
    }
}
