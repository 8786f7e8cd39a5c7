use std::sync::Arc;

use ::http::{Method, Request, StatusCode};
use bson::doc;
use serde_json::{Value, json};
use slate_grid::*;
use slate_grid_http::*;

fn accounts() -> MemoryCollection {
    MemoryCollection::new(
        "accounts",
        vec![
            doc! { "_id": "acct-1", "name": "Acme Corp", "status": "active", "revenue": 50000.0 },
            doc! { "_id": "acct-2", "name": "Globex", "status": "rejected", "revenue": 80000.0 },
            doc! { "_id": "acct-3", "name": "Initech", "status": "active", "revenue": 12000.0 },
            doc! { "_id": "acct-4", "name": "Umbrella", "status": "active", "revenue": 95000.0 },
        ],
    )
}

fn handler(alterations: Arc<MemoryAlterationStore>) -> GridHttp<MemoryCollection> {
    let collection = accounts();
    GridHttp::new(move || {
        Grid::new()
            .id("accounts")
            .route("/accounts")
            .model(collection.clone())
            .column("name", Column::new("Name").sortable())
            .column("revenue", Column::new("Revenue").sortable())
            .column("status", Column::new("Status").hidden(true))
            .filter("status", FilterDef::new("select"))
            .alterations(alterations.clone())
    })
}

fn request(method: Method, uri: &str, body: Value) -> Request<Vec<u8>> {
    let body = if body.is_null() {
        Vec::new()
    } else {
        serde_json::to_vec(&body).unwrap()
    };
    Request::builder().method(method).uri(uri).body(body).unwrap()
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn get_renders_with_query_string_state() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let req = request(
        Method::GET,
        "/accounts?filter[status]=active&sort=revenue&way=1&limit=2",
        Value::Null,
    );
    let resp = http.handle(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/json");

    let body = json_body(resp.body());
    assert_eq!(body["state"]["count"], 3);
    assert_eq!(body["state"]["rows"][0]["name"], "Initech");
    assert_eq!(body["state"]["rows"][1]["name"], "Acme Corp");
    assert_eq!(body["state"]["sort"], json!({ "way": 1, "sort": "revenue" }));
}

#[tokio::test]
async fn post_body_overrides_query() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let req = request(
        Method::POST,
        "/accounts?page=2",
        json!({ "page": 1, "limit": 1, "sort": { "sort": "name", "way": "1" } }),
    );
    let body = json_body(http.handle(req).await.body());
    assert_eq!(body["state"]["page"], 1);
    assert_eq!(body["state"]["rows"][0]["name"], "Acme Corp");
}

#[tokio::test]
async fn viewer_alterations_round_trip() {
    let alterations = Arc::new(MemoryAlterationStore::new());
    let http = handler(alterations.clone());

    let mut req = request(
        Method::POST,
        "/accounts",
        json!({ "alter": { "data": { "column": { "name": { "width": 300 } } } } }),
    );
    req.headers_mut()
        .insert(VIEWER_HEADER, "viewer-1".parse().unwrap());
    let body = json_body(http.handle(req).await.body());
    assert_eq!(body["data"]["column"]["name"]["width"], 300);
    assert_eq!(alterations.len(), 1);

    let body = json_body(http.handle(request(Method::GET, "/accounts", Value::Null)).await.body());
    assert_eq!(body["data"]["column"]["name"]["width"], 300);
}

#[tokio::test]
async fn csv_export_is_an_attachment() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let req = request(Method::GET, "/accounts?export=csv&sort=revenue&way=-1", Value::Null);
    let resp = http.handle(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=accounts-"));
    assert!(disposition.ends_with(".csv"));
    assert_eq!(
        String::from_utf8(resp.body().clone()).unwrap(),
        "Name,Revenue\nUmbrella,95000\nGlobex,80000\nAcme Corp,50000\nInitech,12000\n"
    );
}

#[tokio::test]
async fn xlsx_export_uses_spreadsheet_type() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let resp = http
        .handle(request(Method::GET, "/accounts?export=xlsx", Value::Null))
        .await;
    assert_eq!(
        resp.headers()["content-type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(&resp.body()[..2], b"PK");
}

#[tokio::test]
async fn unknown_export_falls_back_to_json() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let resp = http
        .handle(request(Method::GET, "/accounts?export=pdf", Value::Null))
        .await;
    assert_eq!(resp.headers()["content-type"], "application/json");
    assert_eq!(json_body(resp.body())["state"]["count"], 4);
}

#[tokio::test]
async fn empty_export_is_a_server_error() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let resp = http
        .handle(request(
            Method::GET,
            "/accounts?export=csv&filter[status]=archived",
            Value::Null,
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(resp.body())["error"].is_string());
}

#[tokio::test]
async fn invalid_body_is_bad_request() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let req = Request::builder()
        .method(Method::POST)
        .uri("/accounts")
        .body(b"not json".to_vec())
        .unwrap();
    let resp = http.handle(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_methods_are_rejected() {
    let http = handler(Arc::new(MemoryAlterationStore::new()));
    let resp = http
        .handle(request(Method::DELETE, "/accounts", Value::Null))
        .await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
