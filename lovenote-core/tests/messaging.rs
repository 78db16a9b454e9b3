use lovenote_core::{
    LoveNoteError, OutgoingPayload, WeChatClient, messaging::AccessToken, model::TemplateFields,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> WeChatClient {
    WeChatClient::new("app", "secret")
        .unwrap()
        .with_base_url(server.uri())
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .and(query_param("grant_type", "client_credential"))
        .and(query_param("appid", "app"))
        .and(query_param("secret", "secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "TOKEN", "expires_in": 7200})),
        )
        .mount(server)
        .await;
}

async fn mount_templates(server: &MockServer, templates: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/template/get_all_private_template"))
        .and(query_param("access_token", "TOKEN"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "template_list": templates })),
        )
        .mount(server)
        .await;
}

fn payload() -> OutgoingPayload {
    OutgoingPayload {
        recipient_id: "openid".into(),
        template_id: "tpl".into(),
        fields: TemplateFields::new(vec![("love".into(), "hi".into())]),
    }
}

#[tokio::test]
async fn token_missing_is_protocol_error_with_raw_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 40013, "errmsg": "invalid appid"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).access_token().await.unwrap_err();
    assert!(matches!(err, LoveNoteError::ProviderProtocol { .. }));
    assert!(err.to_string().contains("40013"));
}

#[tokio::test]
async fn field_order_comes_from_matching_template() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_templates(
        &server,
        json!([
            {"template_id": "other", "title": "Other", "content": "{{x.DATA}}"},
            {
                "template_id": "tpl",
                "title": "Daily note",
                "content": "Time: {{time.DATA}}\nMe: {{you.DATA}}\nYou: {{bf.DATA}}\n{{days.DATA}} {{countdown.DATA}}\n{{love.DATA}}\n{{love.DATA}}"
            }
        ]),
    )
    .await;

    let client = client(&server);
    let token = client.access_token().await.unwrap();
    let fields = client.fetch_field_order(&token, "tpl").await.unwrap();

    assert_eq!(fields, vec!["time", "you", "bf", "days", "countdown", "love"]);
}

#[tokio::test]
async fn unknown_template_is_template_not_found() {
    let server = MockServer::start().await;
    mount_templates(&server, json!([{"template_id": "other", "content": "{{x.DATA}}"}])).await;

    let err = client(&server)
        .fetch_field_order(&AccessToken::new("TOKEN"), "tpl")
        .await
        .unwrap_err();
    assert!(matches!(err, LoveNoteError::TemplateNotFound(id) if id == "tpl"));
}

#[tokio::test]
async fn template_without_markers_is_rejected() {
    let server = MockServer::start().await;
    mount_templates(&server, json!([{"template_id": "tpl", "content": "plain text"}])).await;

    let err = client(&server)
        .fetch_field_order(&AccessToken::new("TOKEN"), "tpl")
        .await
        .unwrap_err();
    assert!(matches!(err, LoveNoteError::NoTemplateFields(_)));
}

#[tokio::test]
async fn template_list_error_code_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/template/get_all_private_template"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 42001, "errmsg": "access_token expired"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .list_templates(&AccessToken::new("TOKEN"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("42001"));
}

#[tokio::test]
async fn send_success_on_errcode_zero() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/template/send"))
        .and(query_param("access_token", "TOKEN"))
        .and(body_partial_json(json!({
            "touser": "openid",
            "template_id": "tpl",
            "data": {"love": {"value": "hi"}}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 0, "errmsg": "ok", "msgid": 200228332})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).send(&payload()).await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.msgid, Some(200228332));
}

#[tokio::test]
async fn send_nonzero_errcode_is_fatal_and_reported() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/template/send"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errcode": 40001, "errmsg": "invalid credential"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).send(&payload()).await.unwrap_err();
    assert!(matches!(err, LoveNoteError::ProviderProtocol { .. }));
    assert!(err.to_string().contains("40001"), "{err}");
}

#[tokio::test]
async fn send_non_json_is_transport_error() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/template/send"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = client(&server).send(&payload()).await.unwrap_err();
    match err {
        LoveNoteError::Transport { provider, body, .. } => {
            assert_eq!(provider, "wechat");
            assert!(body.contains("Bad Gateway"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}
