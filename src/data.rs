//! Diagram data acquisition.
//!
//! The host fetches the payload; this module only parses it, and falls back to
//! an embedded sample when the fetch produced nothing usable.

use log::{debug, warn};

use crate::error::Result;
use crate::graph::Node;

/// Sample diagram used when no payload could be fetched.
pub const FALLBACK_PAYLOAD: &str = r#"{"name":"Step Function","node_id":0,"children":[{"name":"tabulate(event)","node_id":1,"children":[{"name":"states","node_id":2,"dest_node_ids":[4,6],"value":3}]},{"name":"Map Iterator","node_id":3,"children":[{"name":"state0(event)","node_id":4,"children":[{"name":"...","node_id":5,"value":1}]},{"name":"state1(event)","node_id":6,"children":[{"name":"...","node_id":7,"value":1}]}]}]}"#;

/// Parse one root record from JSON text.
pub fn parse(text: &str) -> Result<Node> {
    Ok(serde_json::from_str(text)?)
}

/// The fallback sample, parsed.
pub fn fallback() -> Node {
    match parse(FALLBACK_PAYLOAD) {
        Ok(node) => node,
        Err(err) => {
            debug_assert!(false, "embedded sample does not parse: {}", err);
            warn!("embedded sample does not parse ({}), using a single node", err);
            Node::leaf(0, "Step Function", 1.0)
        }
    }
}

/// Parse the fetched payload, or fall back to the embedded sample.
///
/// Never fails: a missing or malformed payload is logged and replaced.
pub fn load(fetched: Option<&str>) -> Node {
    match fetched.map(parse) {
        Some(Ok(node)) => node,
        Some(Err(err)) => {
            debug!("fetched payload unusable ({}), falling back to stored JSON", err);
            fallback()
        }
        None => {
            debug!("nothing fetched, falling back to stored JSON");
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::NodeId;

    #[test]
    fn test_fallback_parses() {
        let root = parse(FALLBACK_PAYLOAD).unwrap();
        assert_eq!(root.name, "Step Function");
        assert_eq!(root.node_id, NodeId(0));
        assert_eq!(root.children().len(), 2);

        let states = &root.children()[0].children()[0];
        assert_eq!(states.name, "states");
        assert_eq!(states.value, Some(3.0));
        assert_eq!(states.destinations(), &[NodeId(4), NodeId(6)]);
    }

    #[test]
    fn test_fallback_is_full_sample() {
        let root = fallback();
        assert_eq!(root, parse(FALLBACK_PAYLOAD).unwrap());
        assert!(!root.children().is_empty());
    }

    #[test]
    fn test_load_prefers_fetched() {
        let root = load(Some(r#"{"name":"solo","node_id":7,"value":2}"#));
        assert_eq!(root.name, "solo");
        assert_eq!(root.node_id, NodeId(7));
    }

    #[test]
    fn test_load_falls_back() {
        assert_eq!(load(None), fallback());
        assert_eq!(load(Some("<html>404</html>")), fallback());
        assert_eq!(load(Some("")).name, "Step Function");
    }

    #[test]
    fn test_parse_reports_malformed() {
        assert!(matches!(parse("{\"name\": 1}"), Err(Error::Json(_))));
    }
}
