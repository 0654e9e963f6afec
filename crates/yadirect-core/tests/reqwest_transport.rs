//! `ReqwestTransport` against a local HTTP server

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yadirect_core::{
    ClientConfig, DirectClient, ErrorKind, LogicalCall, NoopObserver, Resource, RetryPolicy,
};

fn client_for(server: &MockServer, config: ClientConfig) -> DirectClient {
    DirectClient::builder(config.with_api_root(server.uri()))
        .observer(NoopObserver)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_get_sends_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/json/v5/campaigns"))
        .and(header("Authorization", "Bearer wire-token"))
        .and(header("Client-Login", "advertiser"))
        .and(header("Accept-Language", "ru"))
        .and(body_json(json!({
            "method": "get",
            "params": {"SelectionCriteria": {}, "FieldNames": ["Id", "Name"]}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("RequestId", "123456")
                .insert_header("Units", "10/19990/20000")
                .set_body_json(json!({"result": {"Campaigns": [{"Id": 1, "Name": "Spring"}]}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, ClientConfig::new("wire-token").with_login("advertiser"));
    let call = LogicalCall::get(
        Resource::Campaigns,
        json!({"SelectionCriteria": {}, "FieldNames": ["Id", "Name"]}),
    );

    let response = client.call(&call).await.unwrap();

    assert_eq!(response.items().unwrap(), vec![json!({"Id": 1, "Name": "Spring"})]);
    assert_eq!(response.request_ids(), vec!["123456"]);
    assert_eq!(response.units_spent(), 10);
}

#[tokio::test]
async fn test_report_polled_until_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/json/v5/reports"))
        .and(header("processingMode", "auto"))
        .and(header("skipReportHeader", "true"))
        .and(header("skipColumnHeader", "false"))
        .and(header("skipReportSummary", "true"))
        .and(header("returnMoneyInMicros", "false"))
        .respond_with(ResponseTemplate::new(201).insert_header("retryIn", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/json/v5/reports"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/tab-separated-values")
                .set_body_string("Date\tClicks\n2024-03-01\t12\n2024-03-02\t7\n"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, ClientConfig::new("wire-token"));
    let call = LogicalCall::report(json!({
        "SelectionCriteria": {},
        "FieldNames": ["Date", "Clicks"],
        "ReportName": "daily clicks",
        "ReportType": "ACCOUNT_PERFORMANCE_REPORT",
        "DateRangeType": "LAST_7_DAYS",
        "Format": "TSV"
    }));

    let report = client.report(&call).await.unwrap().into_report().unwrap();

    assert_eq!(report.columns().unwrap(), ["Date", "Clicks"]);
    let rows = report.to_dicts().unwrap();
    assert_eq!(rows[1]["Clicks"], "7");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_http_error_surfaces_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/json/v5/ads"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such endpoint"))
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        ClientConfig::new("wire-token").with_retry_policy(RetryPolicy::none()),
    );
    let err = client
        .call(&LogicalCall::get(Resource::Ads, json!({})))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http);
    let api = err.api_error().unwrap();
    assert_eq!(api.status_code, Some(404));
    assert_eq!(api.body_text, "no such endpoint");
}

#[tokio::test]
async fn test_connection_refused() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = DirectClient::builder(
        ClientConfig::new("wire-token")
            .with_api_root(uri)
            .with_retry_policy(RetryPolicy::none()),
    )
    .observer(NoopObserver)
    .build()
    .unwrap();

    let err = client
        .call(&LogicalCall::get(Resource::Ads, json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
}
