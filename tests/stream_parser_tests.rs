use smartsql::api::stream::{decode_event, FrameDecoder};
use smartsql::state::{reduce, Entry, Role, Transcript};
use smartsql::types::StreamEvent;

const BODY: &str = concat!(
    ": keep-alive\n",
    "data: {\"type\":\"token\",\"content\":\"Here are the \"}\n",
    "\n",
    "data: {\"type\":\"tool_start\",\"tool\":\"sql_db_query\",\"input\":{\"q\":\"SELECT naïve\"},\"run_id\":\"r1\"}\n",
    "data:{\"type\":\"tool_end\",\"run_id\":\"r1\",\"output\":\"[(3,)]\"}\r\n",
    "data: {\"type\":\"token\",\"content\":\"3 rows ✓\"}\n",
    "data: {\"type\":\"token\",\"content\":\"unterminated\"}",
);

fn decode_in_chunks(body: &[u8], split_points: &[usize]) -> (Vec<String>, String) {
    let mut decoder = FrameDecoder::new();
    let mut payloads = Vec::new();
    let mut start = 0;
    for &end in split_points.iter().chain(std::iter::once(&body.len())) {
        payloads.extend(decoder.push(&body[start..end]));
        start = end;
    }
    (payloads, decoder.finish())
}

#[test]
fn test_every_two_chunk_split_yields_identical_payloads() {
    let body = BODY.as_bytes();
    let (expected, expected_tail) = decode_in_chunks(body, &[]);
    assert_eq!(expected.len(), 4);
    assert_eq!(
        expected_tail,
        "data: {\"type\":\"token\",\"content\":\"unterminated\"}"
    );

    for split in 0..=body.len() {
        let (payloads, tail) = decode_in_chunks(body, &[split]);
        assert_eq!(payloads, expected, "split at byte {split}");
        assert_eq!(tail, expected_tail, "split at byte {split}");
    }
}

#[test]
fn test_byte_at_a_time_matches_single_chunk() {
    let body = BODY.as_bytes();
    let (expected, expected_tail) = decode_in_chunks(body, &[]);
    let every_byte: Vec<usize> = (1..body.len()).collect();
    let (payloads, tail) = decode_in_chunks(body, &every_byte);
    assert_eq!(payloads, expected);
    assert_eq!(tail, expected_tail);
}

#[test]
fn test_payloads_are_lines_minus_prefix_and_noise() {
    let (payloads, tail) = decode_in_chunks(BODY.as_bytes(), &[]);

    let expected: Vec<String> = BODY
        .split('\n')
        .take(BODY.split('\n').count() - 1)
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.trim_start().to_string())
        .collect();
    assert_eq!(payloads, expected);
    assert!(BODY.ends_with(&tail));
}

#[test]
fn test_decoded_stream_folds_into_transcript() {
    let (payloads, _) = decode_in_chunks(BODY.as_bytes(), &[17, 90, 91, 200]);
    let transcript = payloads
        .iter()
        .map(|payload| decode_event(payload).expect("valid payload"))
        .fold(Transcript::new(), |transcript, event| reduce(transcript, &event));

    assert_eq!(transcript.len(), 3);
    let tool = transcript.get(1).and_then(Entry::as_tool).expect("tool entry");
    assert_eq!(tool.output, Some(serde_json::json!("[(3,)]")));

    let reply = transcript.get(2).and_then(Entry::as_message).expect("message");
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, "3 rows ✓");
}

#[test]
fn test_token_fragments_concatenate_in_order() {
    let fragments = ["SEL", "ECT", " *", " FROM", " users", ";"];
    let transcript = fragments
        .iter()
        .map(|fragment| StreamEvent::Token {
            content: Some(fragment.to_string()),
        })
        .fold(Transcript::new(), |transcript, event| reduce(transcript, &event));

    assert_eq!(transcript.len(), 1);
    assert_eq!(
        transcript.get(0).and_then(Entry::as_message).map(|m| m.content.as_str()),
        Some(fragments.concat().as_str())
    );
}
