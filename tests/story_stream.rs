// tests/story_stream.rs
// End-to-end tests for the incremental story parsing pipeline, driven by
// simulated upstream chunk sequences.

use tokio::sync::mpsc;

use tucktale::error::GenerationError;
use tucktale::llm::UpstreamEvent;
use tucktale::story::draft::StoryDraft;
use tucktale::story::events::StoryStreamEvent;
use tucktale::story::pipeline::pump_upstream;
use tucktale::story::StoryLength;

const DOCUMENT: &str = concat!(
    r#"{"title":"The Brave Fox","#,
    r#""paragraphs":["Scene 1: the fox wakes.","Scene 2: the fox walks.","#,
    r#""Scene 3: the fox wins."],"moral":"Courage grows with practice."}"#
);

/// Run the full pump over the given upstream events and collect everything
/// the client would have seen plus the validation outcome.
async fn run(
    upstream_events: Vec<UpstreamEvent>,
) -> (
    Result<Result<tucktale::story::document::V3Story, GenerationError>, GenerationError>,
    Vec<StoryStreamEvent>,
) {
    let (up_tx, up_rx) = mpsc::channel(256);
    let (client_tx, mut client_rx) = mpsc::channel(256);
    for event in upstream_events {
        up_tx.send(event).await.unwrap();
    }
    drop(up_tx);

    let mut draft = StoryDraft::new();
    let pumped = pump_upstream(up_rx, &mut draft, &client_tx).await;
    drop(client_tx);

    let mut received = Vec::new();
    while let Some(event) = client_rx.recv().await {
        received.push(event);
    }
    (
        pumped.map(|()| draft.finish(StoryLength::Short)),
        received,
    )
}

fn deltas(chunks: &[&str]) -> Vec<UpstreamEvent> {
    let mut events: Vec<UpstreamEvent> =
        chunks.iter().map(|c| UpstreamEvent::Delta(c.to_string())).collect();
    events.push(UpstreamEvent::Done);
    events
}

fn paragraph_events(events: &[StoryStreamEvent]) -> Vec<(u32, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            StoryStreamEvent::Paragraph { index, text } => Some((*index, text.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn paragraph_indexes_are_strictly_increasing_for_any_split() {
    // Split the same document at a handful of awkward boundaries, including
    // char-by-char; every split must produce the identical event sequence.
    let splits: Vec<Vec<String>> = vec![
        vec![DOCUMENT.to_string()],
        DOCUMENT.chars().map(|c| c.to_string()).collect(),
        vec![DOCUMENT[..17].to_string(), DOCUMENT[17..].to_string()],
        DOCUMENT
            .as_bytes()
            .chunks(7)
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect(),
    ];

    for split in splits {
        let chunks: Vec<&str> = split.iter().map(String::as_str).collect();
        let (result, events) = run(deltas(&chunks)).await;
        let paragraphs = paragraph_events(&events);
        assert_eq!(
            paragraphs.iter().map(|(i, _)| *i).collect::<Vec<_>>(),
            vec![0, 1, 2],
            "split into {} chunks broke ordering",
            chunks.len()
        );
        assert!(result.unwrap().is_ok());
    }
}

#[tokio::test]
async fn incremental_paragraphs_match_the_final_parse() {
    let chunks: Vec<String> = DOCUMENT
        .as_bytes()
        .chunks(11)
        .map(|c| String::from_utf8(c.to_vec()).unwrap())
        .collect();
    let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
    let (result, events) = run(deltas(&chunk_refs)).await;

    let story = result.unwrap().unwrap();
    let streamed: Vec<String> = paragraph_events(&events)
        .into_iter()
        .map(|(_, text)| text)
        .collect();
    assert_eq!(streamed, story.paragraph_texts());
    assert_eq!(story.title, "The Brave Fox");
}

#[tokio::test]
async fn title_and_moral_are_emitted_exactly_once() {
    let doc = r#"{"title":"First","moral":"Only","paragraphs":["p"],"title":"Again"}"#;
    let (_result, events) = run(deltas(&[doc])).await;
    let titles = events
        .iter()
        .filter(|e| matches!(e, StoryStreamEvent::Title { .. }))
        .count();
    let morals = events
        .iter()
        .filter(|e| matches!(e, StoryStreamEvent::Moral { .. }))
        .count();
    assert_eq!(titles, 1);
    assert_eq!(morals, 1);
    assert_eq!(
        events[0],
        StoryStreamEvent::Title {
            text: "First".into()
        }
    );
}

#[tokio::test]
async fn truncated_document_fails_validation_after_streaming() {
    let (result, events) = run(deltas(&[r#"{"title":"T","paragraphs":["a","b"#])).await;
    // The values that completed before the cut were still streamed live.
    assert_eq!(
        paragraph_events(&events),
        vec![(0, "a".to_string())]
    );
    let finish = result.unwrap();
    assert!(matches!(finish, Err(GenerationError::MalformedDocument(_))));
}

#[tokio::test]
async fn empty_stream_reports_an_empty_response_not_a_parse_error() {
    let (result, events) = run(vec![UpstreamEvent::Done]).await;
    assert!(events.is_empty());
    let finish = result.unwrap();
    let err = finish.unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse));
    assert!(err.to_string().to_lowercase().contains("empty"));
}

#[tokio::test]
async fn null_moral_generates_no_moral_event() {
    // The documented two-chunk exchange.
    let chunks = [
        r#"{"title":"The B"#,
        r#"rave Fox","paragraphs":["Scene 1: ...","Scene 2: ..."],"moral":null}"#,
    ];
    let (result, events) = run(deltas(&chunks)).await;
    assert_eq!(
        events,
        vec![
            StoryStreamEvent::Title {
                text: "The Brave Fox".into()
            },
            StoryStreamEvent::Paragraph {
                index: 0,
                text: "Scene 1: ...".into()
            },
            StoryStreamEvent::Paragraph {
                index: 1,
                text: "Scene 2: ...".into()
            },
        ]
    );
    let story = result.unwrap().unwrap();
    assert_eq!(story.moral, None);
}

#[tokio::test]
async fn upstream_error_mid_stream_surfaces_as_upstream_failure() {
    let events = vec![
        UpstreamEvent::Delta(r#"{"title":"T","paragraphs":["a""#.to_string()),
        UpstreamEvent::Error("connection reset".to_string()),
    ];
    let (result, _) = run(events).await;
    assert!(matches!(result, Err(GenerationError::Upstream { .. })));
}
