use std::fs;
use std::path::PathBuf;

use hots_lambda_protocol::{
    DecodeError, Protocol, ProtocolError, ProtocolRegistry, SchemaProtocol, DEFAULT_BUILD,
};
use hots_lambda_value::Node;
use serde_json::json;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/protocol34835.json")
}

fn protocol() -> SchemaProtocol {
    SchemaProtocol::load(34835, &fixture_path()).unwrap()
}

const HEADER: &[u8] = &[
    0x05, 0x06, 0x00, 0x02, 0x08, b'H', b'e', b'r', b'o', 0x02, 0x05, 0x08, 0x00, 0x09, 0x02,
    0x02, 0x09, 0x02, 0x04, 0x09, 0x0E, 0x08, 0x09, 0xA6, 0xA0, 0x04, 0x06, 0x09, 0x18,
];

const GAME_EVENTS: &[u8] = &[0x14, 0x03, 0xC9, 0x10, 0x01, 0x05, 0x2C, 0x00, 0x02];

#[test]
fn header_decode_matrix() {
    let header = protocol().decode_header(HEADER).unwrap();
    assert_eq!(header.get("m_signature"), Some(&Node::Bytes(b"Hero".to_vec())));
    assert_eq!(
        header.get("m_version"),
        Some(&Node::from(json!({"m_flags": 1, "m_major": 1, "m_baseBuild": 34835})))
    );
    assert_eq!(header.get("m_length"), Some(&Node::Int(12)));
    assert_eq!(
        header.pointer(&["m_version", "m_baseBuild"]).and_then(Node::as_u64),
        Some(34835)
    );

    // cut inside m_baseBuild
    assert_eq!(
        protocol().decode_header(&HEADER[..24]),
        Err(DecodeError::Truncated)
    );
}

#[test]
fn details_and_init_data_matrix() {
    let protocol = protocol();

    let details = [
        0x05, 0x04, 0x00, 0x02, 0x08, b'T', b'e', b's', b't', 0x02, 0x00, 0x02, 0x05, 0x02, 0x00,
        0x02, 0x08, b'N', b'o', b'v', b'a',
    ];
    assert_eq!(
        protocol.decode_details(&details).unwrap(),
        Node::Object(vec![
            ("m_title".into(), Node::Bytes(b"Test".to_vec())),
            (
                "m_playerList".into(),
                Node::Array(vec![Node::Object(vec![(
                    "m_name".into(),
                    Node::Bytes(b"Nova".to_vec())
                )])])
            ),
        ])
    );

    assert_eq!(
        protocol.decode_init_data(&[0x0C]).unwrap(),
        Node::from(json!({"m_gameSpeed": 4, "m_isBlizzardMap": true}))
    );
}

#[test]
fn game_event_stream_matrix() {
    let protocol = protocol();
    let events: Vec<Node> = protocol
        .decode_game_events(GAME_EVENTS)
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        events,
        vec![
            Node::from(json!({
                "m_x": 200,
                "m_y": 17,
                "_event": "NNet.Game.SMoveEvent",
                "_eventid": 1,
                "_gameloop": 5,
                "_userid": {"m_userId": 3},
                "_bits": 40
            })),
            Node::from(json!({
                "_event": "NNet.Game.SPingEvent",
                "_eventid": 2,
                "_gameloop": 305,
                "_userid": {"m_userId": 0},
                "_bits": 32
            })),
        ]
    );

    let truncated: Vec<_> = protocol.decode_game_events(&GAME_EVENTS[..7]).collect();
    assert_eq!(truncated.len(), 2);
    assert!(truncated[0].is_ok());
    assert_eq!(truncated[1], Err(DecodeError::Truncated));
}

#[test]
fn message_and_tracker_stream_matrix() {
    let protocol = protocol();

    let messages: Vec<Node> = protocol
        .decode_message_events(&[0x04, 0x01, 0x00, 0x02, b'g', b'g'])
        .collect::<Result<_, _>>()
        .unwrap();
    let mut chat = Node::from(json!({
        "m_recipient": 0,
        "m_string": null,
        "_event": "NNet.Game.SChatMessage",
        "_eventid": 0,
        "_gameloop": 1,
        "_userid": {"m_userId": 1},
        "_bits": 48
    }));
    chat.insert("m_string", Node::Bytes(b"gg".to_vec()));
    assert_eq!(messages, vec![chat]);

    assert!(protocol.supports_tracker_events());
    let tracker = [0x03, 0x00, 0x09, 0x0E, 0x09, 0x08, 0x05, 0x02, 0x00, 0x09, 0x02];
    let events: Vec<Node> = protocol
        .decode_tracker_events(&tracker)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        events,
        vec![Node::from(json!({
            "m_playerId": 1,
            "_event": "NNet.Replay.Tracker.SPlayerSetupEvent",
            "_eventid": 4,
            "_gameloop": 7,
            "_bits": 88
        }))]
    );
}

#[test]
fn attributes_decode_through_protocol() {
    let mut data = vec![0x00];
    data.extend_from_slice(&999u32.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&999u32.to_le_bytes());
    data.extend_from_slice(&500u32.to_le_bytes());
    data.push(16);
    data.extend_from_slice(b"nmuH");

    let attrs = protocol().decode_attributes_events(&data).unwrap();
    assert_eq!(
        attrs,
        Node::from(json!({
            "source": 0,
            "mapNamespace": 999,
            "scopes": {"16": {"500": [{"namespace": 999, "attrid": 500, "value": "Humn"}]}}
        }))
    );
}

#[test]
fn registry_load_dir_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let schema = fs::read_to_string(fixture_path()).unwrap();
    fs::write(dir.path().join("protocol34835.json"), &schema).unwrap();
    fs::write(dir.path().join("protocol39153.json"), &schema).unwrap();
    fs::write(dir.path().join("README.txt"), "not a protocol").unwrap();

    let registry = ProtocolRegistry::load_dir(dir.path(), DEFAULT_BUILD).unwrap();
    assert_eq!(registry.builds().collect::<Vec<_>>(), vec![34835, 39153]);
    assert_eq!(registry.default_build(), 34835);

    let exact = registry.resolve(39153).unwrap();
    assert!(!exact.fallback);
    assert_eq!(exact.protocol.base_build(), 39153);

    let fallback = registry.resolve(12345).unwrap();
    assert!(fallback.fallback);
    assert_eq!(fallback.protocol.base_build(), 34835);

    let err = ProtocolRegistry::load_dir(dir.path(), 40000).unwrap_err();
    assert!(matches!(err, ProtocolError::MissingDefault(40000)));
}

#[test]
fn registry_load_dir_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
        ProtocolRegistry::load_dir(&missing, DEFAULT_BUILD),
        Err(ProtocolError::Io { .. })
    ));

    fs::write(dir.path().join("protocol34835.json"), "{\"typeinfos\": [").unwrap();
    assert!(matches!(
        ProtocolRegistry::load_dir(dir.path(), DEFAULT_BUILD),
        Err(ProtocolError::Parse { build: 34835, .. })
    ));
}
