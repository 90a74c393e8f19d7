//! Transport-level tests for the EWS client against a mock server.
//!
//! The client is configured with NTLM credentials so the endpoint is
//! the mock server and no token round-trip is involved; the OAuth
//! token cache has its own test below.

use roomsync_core::Configuration;
use roomsync_ews::{EwsClient, EwsError, TokenCache};
use secrecy::SecretString;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(ews_url: &str) -> Configuration {
    Configuration {
        username: Some("DOMAIN\\svc".into()),
        password: Some("hunter2".into()),
        ews_url: Some(ews_url.to_string()),
        service_user_upn: "svc@x.test".into(),
        booking_url: "http://booking.test".into(),
        refresh_interval: 60,
        request_timeout: 10,
        ..Configuration::default()
    }
}

fn soap(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
  <s:Body>{body}</s:Body>
</s:Envelope>"#
    )
}

fn occurrence_response(index: i32) -> String {
    soap(&format!(
        r#"<m:GetItemResponse><m:ResponseMessages>
        <m:GetItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:Items>
            <t:CalendarItem>
              <t:ItemId Id="occ-{index}" ChangeKey="ck-{index}" />
              <t:UID>AABB02</t:UID>
              <t:Subject>Review</t:Subject>
              <t:Start>2024-01-0{index}T09:00:00Z</t:Start>
              <t:End>2024-01-0{index}T09:45:00Z</t:End>
              <t:Organizer><t:Mailbox><t:EmailAddress>bob@x.test</t:EmailAddress></t:Mailbox></t:Organizer>
              <t:CalendarItemType>Occurrence</t:CalendarItemType>
            </t:CalendarItem>
          </m:Items>
        </m:GetItemResponseMessage>
      </m:ResponseMessages></m:GetItemResponse>"#
    ))
}

fn error_response(code: &str) -> String {
    soap(&format!(
        r#"<m:GetItemResponse><m:ResponseMessages>
        <m:GetItemResponseMessage ResponseClass="Error">
          <m:ResponseCode>{code}</m:ResponseCode>
          <m:Items />
        </m:GetItemResponseMessage>
      </m:ResponseMessages></m:GetItemResponse>"#
    ))
}

const FAULT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode xmlns:a="http://schemas.microsoft.com/exchange/services/2006/types">a:ErrorInvalidSyncStateData</faultcode>
      <faultstring xml:lang="en-US">The sync state data is corrupt.</faultstring>
      <detail>
        <e:ResponseCode xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">ErrorInvalidSyncStateData</e:ResponseCode>
        <e:Message xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">The sync state data is corrupt.</e:Message>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

const MAILBOX_FAULT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode xmlns:a="http://schemas.microsoft.com/exchange/services/2006/types">a:ErrorNonExistentMailbox</faultcode>
      <faultstring xml:lang="en-US">The SMTP address has no mailbox associated with it.</faultstring>
      <detail>
        <e:ResponseCode xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">ErrorNonExistentMailbox</e:ResponseCode>
        <e:Message xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">The SMTP address has no mailbox associated with it.</e:Message>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

#[tokio::test]
async fn get_rooms_sends_basic_auth_and_parses_the_list() {
    let server = MockServer::start().await;
    let rooms_xml = soap(
        r#"<m:GetRoomsResponse ResponseClass="Success">
      <m:ResponseCode>NoError</m:ResponseCode>
      <m:Rooms>
        <t:Room><t:Id><t:Name>Room A</t:Name><t:EmailAddress>a@x.test</t:EmailAddress></t:Id></t:Room>
        <t:Room><t:Id><t:Name>Room B</t:Name><t:EmailAddress>b@x.test</t:EmailAddress></t:Id></t:Room>
      </m:Rooms>
    </m:GetRoomsResponse>"#,
    );
    Mock::given(method("POST"))
        .and(path("/EWS/Exchange.asmx"))
        .and(header("Content-Type", "text/xml; charset=utf-8"))
        .and(body_string_contains("GetRooms"))
        .and(body_string_contains("first.floor@x.test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rooms_xml))
        .expect(1)
        .mount(&server)
        .await;

    let client = EwsClient::new(&config(&format!("{}/EWS/Exchange.asmx", server.uri()))).unwrap();
    let rooms = client.get_rooms("first.floor@x.test").await.unwrap();
    assert_eq!(rooms.len(), 2);
    assert_eq!(rooms[0].email, "a@x.test");
}

#[tokio::test]
async fn sync_surfaces_soap_faults_as_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(FAULT))
        .mount(&server)
        .await;

    let client = EwsClient::new(&config(&server.uri())).unwrap();
    let err = client.sync_folder_items("a@x.test", "").await.unwrap_err();
    match err {
        EwsError::Fault { response_code, .. } => {
            assert_eq!(response_code, "ErrorInvalidSyncStateData");
        }
        other => panic!("expected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn expansion_walks_instances_until_out_of_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(r#"InstanceIndex="1""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(occurrence_response(1)))
        .mount(&server)
        .await;
    // Instance 2 was deleted from the series; the loop must continue.
    Mock::given(method("POST"))
        .and(body_string_contains(r#"InstanceIndex="2""#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(error_response("ErrorCalendarOccurrenceIsDeletedFromRecurrence")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains(r#"InstanceIndex="3""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(occurrence_response(3)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains(r#"InstanceIndex="4""#))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(error_response(
                "ErrorCalendarOccurrenceIndexIsOutOfRecurrenceRange",
            )),
        )
        .mount(&server)
        .await;

    let client = EwsClient::new(&config(&server.uri())).unwrap();
    let items = client
        .expand_recurring_master("master-1", "a@x.test")
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].instance_index, 1);
    assert_eq!(items[1].instance_index, 3);
    assert_eq!(items[1].item_id, "occ-3");
}

#[tokio::test]
async fn create_maps_the_missing_mailbox_fault() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(MAILBOX_FAULT))
        .mount(&server)
        .await;

    let client = EwsClient::new(&config(&server.uri())).unwrap();
    let appointment = roomsync_ews::Appointment {
        organizer: "nobody@x.test".into(),
        subject: "Booking".into(),
        start: chrono::Utc::now(),
        end: chrono::Utc::now(),
        location: "a@x.test".into(),
        attendees: vec!["a@x.test".into()],
    };
    let err = client.create_appointment(&appointment).await.unwrap_err();
    assert!(matches!(err, EwsError::NonExistentMailbox));
}

#[tokio::test]
async fn empty_find_result_means_declined() {
    let server = MockServer::start().await;
    let empty = soap(
        r#"<m:FindItemResponse><m:ResponseMessages>
        <m:FindItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:RootFolder TotalItemsInView="0" IncludesLastItemInRange="true">
            <t:Items />
          </m:RootFolder>
        </m:FindItemResponseMessage>
      </m:ResponseMessages></m:FindItemResponse>"#,
    );
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty))
        .mount(&server)
        .await;

    let client = EwsClient::new(&config(&server.uri())).unwrap();
    let err = client
        .find_resource_events("AABB01", &["a@x.test".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, EwsError::Declined));
}

#[tokio::test]
async fn resolve_dn_caches_and_passes_smtp_through() {
    let server = MockServer::start().await;
    let resolved = soap(
        r#"<m:ResolveNamesResponse><m:ResponseMessages>
        <m:ResolveNamesResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:ResolutionSet TotalItemsInView="1" IncludesLastItemInRange="true">
            <t:Resolution>
              <t:Mailbox><t:Name>Bob</t:Name><t:EmailAddress>bob@x.test</t:EmailAddress></t:Mailbox>
            </t:Resolution>
          </m:ResolutionSet>
        </m:ResolveNamesResponseMessage>
      </m:ResponseMessages></m:ResolveNamesResponse>"#,
    );
    Mock::given(method("POST"))
        .and(body_string_contains("ResolveNames"))
        .respond_with(ResponseTemplate::new(200).set_body_string(resolved))
        .expect(1)
        .mount(&server)
        .await;

    let client = EwsClient::new(&config(&server.uri())).unwrap();

    // SMTP addresses never hit the server.
    assert_eq!(
        client.resolve_dn("alice@x.test").await.unwrap(),
        "alice@x.test"
    );

    let dn = "/o=Org/ou=Unit/cn=Recipients/cn=bob";
    assert_eq!(client.resolve_dn(dn).await.unwrap(), "bob@x.test");
    // Cached: the expect(1) on the mock verifies no second request.
    assert_eq!(client.resolve_dn(dn).await.unwrap(), "bob@x.test");
}

#[tokio::test]
async fn token_cache_reuses_unexpired_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token-abc",
            "expires_in": 3600,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = TokenCache::with_login_endpoint(
        "client-1".into(),
        SecretString::from("secret".to_string()),
        "tenant-1".into(),
        server.uri(),
    );
    assert_eq!(cache.get_token().await.unwrap(), "token-abc");
    assert_eq!(cache.get_token().await.unwrap(), "token-abc");
}
