// tests/chunking_property.rs

use proptest::prelude::*;
use rigwatch::BackendKind;
use rigwatch::events::LogEvent;
use rigwatch::parse::LogStreamParser;

fn parser(backend: BackendKind) -> LogStreamParser {
    let (_, classifier) = backend.strategies();
    LogStreamParser::new(classifier)
}

/// Feed `bytes` split at the given cut points.
fn events_for_chunks(backend: BackendKind, bytes: &[u8], cuts: &[usize]) -> Vec<LogEvent> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut parser = parser(backend);
    let mut events = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(bytes.len())) {
        events.extend(parser.push(&bytes[start..cut]));
        start = cut;
    }
    events
}

fn xmr_stak_line() -> impl Strategy<Value = String> {
    prop_oneof![
        (0.0f64..10_000.0).prop_map(|r| format!("Totals (ALL):   {r:.1}  0.0  0.0 H/s")),
        "[a-z ]{0,20}".prop_map(|m| format!("[2024-01-01 12:00:00] : ERROR: {m}")),
        "[a-zA-Z0-9 ]{0,30}".prop_map(|m| format!("[2024-01-01 12:00:00] : {m}")),
        "[a-z]{1,8}".prop_map(|m| format!("\x1b[1;32m{m}\x1b[0m ready é")),
    ]
}

fn xmrig_line() -> impl Strategy<Value = String> {
    prop_oneof![
        (0.0f64..10_000.0).prop_map(|r| format!("RES|ts|speed|{r:.1}|H/s")),
        "[a-z ]{1,20}".prop_map(|m| format!("ERR|ts|{m}")),
        "[a-z|]{0,20}".prop_map(|m| format!("NET|ts|{m}")),
        Just("ERR".to_string()),
    ]
}

fn stream(lines: Vec<String>, crlf: bool, tail: &str) -> Vec<u8> {
    let eol = if crlf { "\r\n" } else { "\n" };
    let mut text: String = lines.iter().map(|l| format!("{l}{eol}")).collect();
    text.push_str(tail);
    text.into_bytes()
}

proptest! {
    #[test]
    fn xmr_stak_events_do_not_depend_on_chunking(
        lines in proptest::collection::vec(xmr_stak_line(), 0..12),
        crlf in any::<bool>(),
        tail in "[a-z ]{0,10}",
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let bytes = stream(lines.clone(), crlf, &tail);
        let whole = events_for_chunks(BackendKind::XmrStak, &bytes, &[]);
        let chunked = events_for_chunks(BackendKind::XmrStak, &bytes, &cuts);

        prop_assert_eq!(whole.len(), lines.len());
        prop_assert_eq!(whole, chunked);
    }

    #[test]
    fn xmrig_events_do_not_depend_on_chunking(
        lines in proptest::collection::vec(xmrig_line(), 0..12),
        crlf in any::<bool>(),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let bytes = stream(lines.clone(), crlf, "RES|ts|spe");
        let whole = events_for_chunks(BackendKind::Xmrig, &bytes, &[]);
        let chunked = events_for_chunks(BackendKind::Xmrig, &bytes, &cuts);

        prop_assert_eq!(whole.len(), lines.len());
        prop_assert_eq!(whole, chunked);
    }
}

#[test]
fn unterminated_fragment_is_never_classified() {
    let mut parser = parser(BackendKind::XmrStak);
    assert!(parser.push(b"Totals (ALL): 5").is_empty());
    assert_eq!(parser.pending(), "Totals (ALL): 5");
    assert_eq!(parser.push(b"0.0\n"), vec![LogEvent::hash_rate(50.0)]);
    assert_eq!(parser.pending(), "");
}
