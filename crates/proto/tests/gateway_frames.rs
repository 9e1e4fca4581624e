use proto::{
    GatewayEvent, HelloData, IdentifyData, IdentifyProperties, Opcode, ReadyData, intents,
};

#[test]
fn hello_frame_contract() {
    let frame = GatewayEvent::decode(r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#)
        .expect("hello frame");
    assert_eq!(frame.opcode().expect("opcode"), Opcode::Hello);

    let hello: HelloData = serde_json::from_value(frame.d).expect("hello payload");
    assert_eq!(hello.heartbeat_interval, 41250);
}

#[test]
fn identify_frame_contract() {
    let identify = IdentifyData {
        token: "bot-token".to_string(),
        intents: intents::DEFAULT,
        properties: IdentifyProperties {
            os: "linux".to_string(),
            browser: "cnayp-bot".to_string(),
            device: "cnayp-bot".to_string(),
        },
    };
    let text = GatewayEvent::identify(&identify)
        .expect("identify frame")
        .encode()
        .expect("encode");

    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["op"], 2);
    assert_eq!(value["d"]["token"], "bot-token");
    assert_eq!(value["d"]["intents"], 33281);
    assert_eq!(value["d"]["properties"]["os"], "linux");
    assert_eq!(value["d"]["properties"]["browser"], "cnayp-bot");
    assert!(value.get("s").is_none());
    assert!(value.get("t").is_none());
}

#[test]
fn ready_dispatch_contract() {
    let frame = GatewayEvent::decode(
        r#"{"op":0,"s":1,"t":"READY","d":{"session_id":"abc123","user":{"id":"9","username":"cnayp","discriminator":"0001","bot":true},"guilds":[]}}"#,
    )
    .expect("ready frame");
    assert_eq!(frame.t.as_deref(), Some(proto::READY_EVENT));

    let ready: ReadyData = serde_json::from_value(frame.d).expect("ready payload");
    assert_eq!(ready.session_id, "abc123");
    let user = ready.user.expect("user");
    assert_eq!(user.username, "cnayp");
    assert!(user.bot);
}
