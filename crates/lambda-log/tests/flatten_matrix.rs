use hots_lambda_log::{flatten, to_lambda_line, EventStats};
use hots_lambda_value::Node;
use serde_json::json;

fn line(value: serde_json::Value) -> String {
    to_lambda_line(&flatten(Node::from(value)))
}

#[test]
fn flat_records_are_unchanged() {
    let input = json!({"x": 1, "y": "Humn", "z": true});
    let out = flatten(Node::from(input.clone()));
    let Node::Object(fields) = Node::from(input) else {
        unreachable!()
    };
    assert_eq!(out.into_iter().collect::<Vec<_>>(), fields);
}

#[test]
fn lambda_line_matrix() {
    assert_eq!(line(json!({"x": 1, "y": "Humn"})), "x[1],y[Humn]");
    assert_eq!(line(json!({"a": [1, 2, 3]})), "a[[1, 2, 3]]");
    assert_eq!(line(json!({"a": {"b": {"c": 5}}})), "a_b_c[5]");
    assert_eq!(line(json!({"a": [{"x": 1, "y": 2}]})), "a_x[1],a_y[2]");
    assert_eq!(line(json!({"a": {}, "b": null})), "b[None]");
}

#[test]
fn attribute_table_flattens_through_singleton_lists() {
    let attributes = json!({
        "source": 0,
        "mapNamespace": 999,
        "scopes": {
            "1": {
                "500": [{"namespace": 999, "attrid": 500, "value": "Humn"}],
                "3009": [{"namespace": 999, "attrid": 3009, "value": "Amm"}]
            }
        }
    });
    assert_eq!(
        line(attributes),
        "source[0],mapNamespace[999],\
         scopes_1_500_namespace[999],scopes_1_500_attrid[500],scopes_1_500_value[Humn],\
         scopes_1_3009_namespace[999],scopes_1_3009_attrid[3009],scopes_1_3009_value[Amm]"
    );
}

#[test]
fn decoded_event_line_and_stats() {
    let events = vec![
        json!({"m_target": {"x": 10, "y": 20}, "_event": "Move", "_eventid": 1, "_gameloop": 4, "_userid": {"m_userId": 0}, "_bits": 16}),
        json!({"m_target": {"x": 11, "y": 21}, "_event": "Move", "_eventid": 1, "_gameloop": 9, "_userid": {"m_userId": 0}, "_bits": 24}),
        json!({"m_string": "gl hf", "_event": "Chat", "_eventid": 0, "_gameloop": 9, "_userid": {"m_userId": 1}, "_bits": 800}),
    ];

    let mut stats = EventStats::new();
    let mut lines = Vec::new();
    for event in events {
        let node = Node::from(event);
        stats.record(&node);
        lines.push(to_lambda_line(&flatten(node)));
    }

    assert_eq!(
        lines[0],
        "m_target_x[10],m_target_y[20],_event[Move],_eventid[1],_gameloop[4],_userid_m_userId[0],_bits[16]"
    );
    assert_eq!(
        lines[2],
        "m_string[gl hf],_event[Chat],_eventid[0],_gameloop[9],_userid_m_userId[1],_bits[800]"
    );

    let mut summary = Vec::new();
    stats.write_summary(&mut summary).unwrap();
    assert_eq!(
        String::from_utf8(summary).unwrap(),
        "\"Move\", 2, 5,\n\"Chat\", 1, 100,\n"
    );
}

#[test]
fn terminal_values_render_like_existing_logs() {
    assert_eq!(
        line(json!({"b": false, "n": null, "l": ["Humn", "Amm"], "f": 1.0})),
        "b[False],n[None],l[['Humn', 'Amm']],f[1.0]"
    );
    // bit arrays decode to a two element list
    assert_eq!(line(json!({"bits": [4, 10]})), "bits[[4, 10]]");
}
