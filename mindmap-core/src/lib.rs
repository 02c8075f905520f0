pub mod builder;
pub mod error;
pub mod extraction;
pub mod ingest;
pub mod store;

// Re-export commonly used types
pub use builder::{
    ClickOutcome, ExpansionState, MindMapEdge, MindMapGraph, MindMapNode, PositionedNode, ROOT_ID,
    assemble, build, dispatch_click, layout,
};
pub use error::{MindMapError, Result};
pub use extraction::{
    ExtractionPhase, ExtractionSnapshot, ExtractionState, GENERAL_CONTEXT, KeyPoint,
};
pub use ingest::IngestionAdapter;
pub use store::{InMemorySessionStorage, MapSession, SessionStorage, require_session};

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(title: Option<&str>, points: &[(&str, Option<&str>)]) -> ExtractionSnapshot {
        ExtractionSnapshot {
            title: title.map(Into::into),
            key_points: points
                .iter()
                .map(|(p, c)| KeyPoint {
                    point: Some((*p).into()),
                    context: c.map(Into::into),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn streamed_extraction_grows_a_stable_map() {
        let session = MapSession::create("fp");

        // first partial: title still streaming, one uncontexted point
        session
            .adapter
            .apply(1, snapshot(None, &[("A", None)]))
            .unwrap();
        let graph = session.graph();
        assert_eq!(graph.nodes[0].label, extraction::LOADING_LABEL);
        assert_eq!(graph.nodes.len(), 3); // root, General, point-0

        // user collapses General mid-stream
        session.click("context-General").unwrap();
        assert_eq!(session.graph().nodes.len(), 2);

        // later cumulative snapshot adds a new context group
        session
            .adapter
            .apply(
                2,
                snapshot(Some("Report"), &[("A", None), ("B", Some("Intro"))]),
            )
            .unwrap();
        let graph = session.graph();

        // General stayed collapsed across the rebuild, the new group came
        // up expanded, and ids were preserved
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["root", "context-General", "context-Intro", "point-1"]);
        assert_eq!(graph.nodes[0].label, "Report");

        // final snapshot validates and completes
        session
            .adapter
            .complete(
                3,
                snapshot(Some("Report"), &[("A", None), ("B", Some("Intro"))]),
            )
            .unwrap();
        assert_eq!(session.adapter.phase(), ExtractionPhase::Complete);
        assert_eq!(session.graph().nodes.len(), 4);
    }

    #[tokio::test]
    async fn failed_exchange_leaves_an_empty_map() {
        let session = MapSession::create("fp");
        session
            .adapter
            .apply(1, snapshot(Some("Doc"), &[("A", None)]))
            .unwrap();

        session.adapter.fail("connection reset");

        // the builder is only ever handed a valid, now-empty state
        assert!(session.graph().is_empty());
        assert_eq!(session.adapter.phase(), ExtractionPhase::Failed);
    }
}
