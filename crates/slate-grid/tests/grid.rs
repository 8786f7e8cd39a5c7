use std::sync::{Arc, Mutex};

use bson::{Bson, doc};
use serde_json::{Map, Value, json};
use slate_grid::*;

type PeopleColumn = Column<MemoryCollection>;
type PeopleFilter = FilterDef<MemoryCollection>;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn people() -> MemoryCollection {
    MemoryCollection::new(
        "people",
        vec![
            doc! { "_id": "a", "name": "Ada", "age": 3, "status": "active" },
            doc! { "_id": "b", "name": "Bob", "age": 1, "status": "inactive" },
            doc! { "_id": "c", "name": "Cy", "age": 2, "status": "active" },
        ],
    )
}

fn names(response: &Value) -> Vec<&str> {
    response["state"]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn formatted_columns_render_as_strings() {
    let model = MemoryCollection::new(
        "people",
        vec![
            doc! { "_id": "A", "name": "A", "age": 1 },
            doc! { "_id": "B", "name": "B", "age": 2 },
        ],
    );
    let mut grid = Grid::new()
        .model(model)
        .column("name", PeopleColumn::new("Name"))
        .column(
            "age",
            PeopleColumn::new("Age").format(|value, _| match value {
                Bson::Int32(n) => Bson::Int32(n + 1),
                other => other,
            }),
        );

    let response = grid.render(&RequestContext::new()).await.unwrap();
    assert_eq!(response["state"]["count"], 2);
    assert_eq!(
        response["state"]["rows"],
        json!([
            { "_id": "A", "name": "A", "age": "2" },
            { "_id": "B", "name": "B", "age": "3" },
        ])
    );
    assert_eq!(response["state"]["limit"], 20);
    assert_eq!(response["state"]["page"], 1);
}

#[tokio::test]
async fn plain_filter_applies_equality_before_counting() {
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .filter("status", PeopleFilter::new("select"));

    let ctx = RequestContext::new().with_query_string("filter[status]=active");
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(response["state"]["count"], 2);
    assert_eq!(names(&response), ["Ada", "Cy"]);
    assert_eq!(response["state"]["filter"], json!({ "status": "active" }));
}

#[tokio::test]
async fn blank_filters_are_ignored() {
    for value in [json!(""), json!({}), json!(0), json!(false), json!(null)] {
        let mut grid = Grid::new()
            .model(people())
            .column("name", PeopleColumn::new("Name"))
            .filter("status", PeopleFilter::new("select"));
        let ctx = RequestContext::new().with_body(object(json!({ "filter": { "status": value } })));
        let response = grid.render(&ctx).await.unwrap();
        assert_eq!(response["state"]["count"], 3, "{value}");
    }
}

#[tokio::test]
async fn custom_filter_replaces_equality() {
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .filter(
            "min_age",
            PeopleFilter::new("number").query(|query: MemoryCollection, value| async move {
                let min = value.as_i64().unwrap_or_default();
                Ok(query.gte("age", min))
            }),
        );

    let ctx = RequestContext::new().with_body(object(json!({ "filter": { "min_age": 2 } })));
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(response["state"]["count"], 2);
    assert_eq!(names(&response), ["Ada", "Cy"]);
}

#[tokio::test]
async fn custom_sort_is_adopted_instead_of_default() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .column(
            "age",
            PeopleColumn::new("Age").sort_with(move |query: MemoryCollection, way| {
                seen.lock().unwrap().push(way);
                async move { Ok(query.sort("name", way)) }
            }),
        );

    let ctx = RequestContext::new().with_body(object(json!({ "sort": { "sort": "age", "way": -1 } })));
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![-1]);
    // Sorted by name descending, not by age.
    assert_eq!(names(&response), ["Cy", "Bob", "Ada"]);
    assert_eq!(response["state"]["sort"], json!({ "way": -1, "sort": "age" }));
}

#[tokio::test]
async fn default_sort_and_disabled_way() {
    let grid = || {
        Grid::new()
            .model(people())
            .column("name", PeopleColumn::new("Name"))
            .column("age", PeopleColumn::new("Age").sortable())
    };

    let ctx = RequestContext::new().with_query_string("sort=age&way=1");
    let response = grid().render(&ctx).await.unwrap();
    assert_eq!(names(&response), ["Bob", "Cy", "Ada"]);

    let ctx = RequestContext::new().with_query_string("sort=age&way=false");
    let response = grid().render(&ctx).await.unwrap();
    assert_eq!(names(&response), ["Ada", "Bob", "Cy"]);
    assert_eq!(response["state"]["sort"], json!({ "way": false, "sort": false }));

    // Missing direction sorts descending.
    let ctx = RequestContext::new().with_query_string("sort=age");
    let response = grid().render(&ctx).await.unwrap();
    assert_eq!(names(&response), ["Ada", "Cy", "Bob"]);
}

#[tokio::test]
async fn sort_on_unknown_key_uses_the_store() {
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .sort("age", 1);
    let response = grid.render(&RequestContext::new()).await.unwrap();
    assert_eq!(names(&response), ["Bob", "Cy", "Ada"]);
}

#[tokio::test]
async fn pagination_skips_whole_pages() {
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .limit(2);

    let ctx = RequestContext::new().with_query_string("page=2");
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(response["state"]["count"], 3);
    assert_eq!(response["state"]["limit"], 2);
    assert_eq!(response["state"]["page"], 2);
    assert_eq!(names(&response), ["Cy"]);
}

#[tokio::test]
async fn resolution_reports_skip() {
    let mut grid = Grid::new().model(people()).limit(2);
    grid.apply_request(&RequestContext::new().with_query_string("page=3&limit=1"));
    let resolution = grid.resolve().await.unwrap();
    assert_eq!(resolution.limit, 1);
    assert_eq!(resolution.page, 3);
    assert_eq!(resolution.skip, 2);
    assert_eq!(resolution.rows.len(), 1);
}

#[tokio::test]
async fn huge_page_size_saturates_the_skip() {
    let mut grid = Grid::new().model(people());
    let ctx = RequestContext::new().with_query_string("limit=9223372036854775807&page=4");
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(response["state"]["count"], 3);
    assert_eq!(response["state"]["page"], 4);
    assert_eq!(response["state"]["rows"], json!([]));

    let mut grid = Grid::new().model(people());
    grid.apply_request(&RequestContext::new().with_query_string("limit=9223372036854775807&page=4"));
    let resolution = grid.resolve().await.unwrap();
    assert_eq!(resolution.skip, usize::MAX);
}

#[tokio::test]
async fn invalid_paging_reads_through_to_declared_values() {
    let mut grid = Grid::new().model(people()).limit(1).page(3);
    grid.apply_request(&RequestContext::new().with_query_string("page=0&limit="));
    let resolution = grid.resolve().await.unwrap();
    assert_eq!(resolution.limit, 1);
    assert_eq!(resolution.page, 3);
    assert_eq!(resolution.skip, 2);
    assert_eq!(resolution.rows.len(), 1);

    let mut grid = Grid::new().model(people());
    grid.apply_request(&RequestContext::new().with_query_string("page=-2&limit=abc"));
    let resolution = grid.resolve().await.unwrap();
    assert_eq!(resolution.limit, 20);
    assert_eq!(resolution.page, 1);
}

#[tokio::test]
async fn grid_without_model_is_empty() {
    let mut grid = Grid::new().column("name", PeopleColumn::new("Name"));
    let response = grid.render(&RequestContext::new()).await.unwrap();
    assert_eq!(response["state"]["count"], 0);
    assert_eq!(response["state"]["rows"], json!([]));
    assert_eq!(response["data"]["column"]["name"]["title"], "Name");
}

#[tokio::test]
async fn model_mode_and_metadata() {
    let mut grid = Grid::new()
        .id("people-grid")
        .route("/people")
        .row("person-row")
        .models(true)
        .model(people())
        .column("profile.name", PeopleColumn::new("Name").sortable().width(200))
        .filter("status", PeopleFilter::new("select").title("Status"))
        .include(object(json!({ "extra": { "ok": true } })));

    let ctx = RequestContext::new().with_query_string("limit=1");
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(response["data"]["id"], "people-grid");
    assert_eq!(response["data"]["route"], "/people");
    assert_eq!(response["data"]["row"], "person-row");
    assert_eq!(response["data"]["model"], "people");
    assert_eq!(
        response["data"]["column"]["profile__name"],
        json!({
            "id": "profile__name",
            "title": "Name",
            "sort": true,
            "hidden": false,
            "width": 200,
            "priority": 100,
            "update": false,
        })
    );
    assert_eq!(
        response["data"]["filter"]["status"],
        json!({ "id": "status", "type": "select", "title": "Status", "priority": 100 })
    );
    assert_eq!(response["extra"], json!({ "ok": true }));

    let row = &response["state"]["rows"][0];
    assert_eq!(row["_id"], "a");
    assert_eq!(row["status"], "active");
}

#[tokio::test]
async fn updates_reach_only_columns_with_updaters() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let model = people();
    let mut grid = Grid::new()
        .model(model.clone())
        .column("name", PeopleColumn::new("Name"))
        .column(
            "age",
            PeopleColumn::new("Age").update(Some("number"), move |ctx, row: &bson::Document, value| {
                let call = (ctx.viewer.clone(), row.id(), value);
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push(call);
                    Ok(())
                }
            }),
        );

    let ctx = RequestContext::new().with_viewer("v1").with_body(object(json!({
        "update": {
            "a": { "age": 99, "name": "ignored" },
            "missing": { "age": 1 },
        }
    })));
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec![(Some("v1".to_string()), "a".to_string(), json!(99))]
    );
    assert_eq!(response["data"]["column"]["age"]["update"], "number");
    assert!(response["state"].get("update").is_none());
}

#[tokio::test]
async fn editable_column_writes_through_memory_store() {
    let model = people();
    let store = model.clone();
    let mut grid = Grid::new()
        .model(model)
        .column(
            "name",
            PeopleColumn::new("Name").update(None, move |_, row: &bson::Document, value| {
                let store = store.clone();
                let id = row.id();
                async move {
                    let name = value.as_str().unwrap_or_default().to_string();
                    store.update_field(&id, "name", Bson::String(name))?;
                    Ok::<(), GridError>(())
                }
            }),
        );

    let ctx = RequestContext::new().with_body(object(json!({ "update": { "b": { "name": "Robert" } } })));
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(names(&response), ["Ada", "Robert", "Cy"]);
}

#[tokio::test]
async fn alterations_persist_for_viewers_and_merge_into_response() {
    let alterations = Arc::new(MemoryAlterationStore::new());
    let grid = || {
        Grid::new()
            .id("people-grid")
            .model(people())
            .column("name", PeopleColumn::new("Name"))
            .alterations(alterations.clone())
    };

    let alter = json!({ "data": { "column": { "name": { "hidden": true } } } });
    let ctx = RequestContext::new()
        .with_viewer("v1")
        .with_body(object(json!({ "alter": alter })));
    let response = grid().render(&ctx).await.unwrap();
    assert_eq!(response["data"]["column"]["name"]["hidden"], true);
    assert_eq!(response["data"]["column"]["name"]["title"], "Name");
    assert_eq!(response["alter"], alter);
    assert_eq!(alterations.len(), 1);

    // A later request without `alter` still gets the saved overlay.
    let response = grid().render(&RequestContext::new()).await.unwrap();
    assert_eq!(response["data"]["column"]["name"]["hidden"], true);
}

#[tokio::test]
async fn anonymous_alterations_are_not_saved() {
    let alterations = Arc::new(MemoryAlterationStore::new());
    let mut grid = Grid::new()
        .route("/people")
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .alterations(alterations.clone());

    let ctx = RequestContext::new()
        .with_session("s1")
        .with_body(object(json!({ "alter": { "state": { "note": "x" } } })));
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(response["state"]["note"], "x");
    assert!(alterations.is_empty());
}

#[tokio::test]
async fn export_skips_hidden_columns() {
    let mut grid = Grid::new()
        .id("people")
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .column("status", PeopleColumn::new("Status").hidden(true));

    let ctx = RequestContext::new().with_query_string("export=csv&limit=1");
    let ExportOutcome::File(file) = grid.export(&ctx).await.unwrap() else {
        panic!("expected a file");
    };
    assert!(file.filename.starts_with("people-"));
    assert!(file.filename.ends_with(".csv"));
    assert!(file.content_type.starts_with("text/csv"));
    // Pagination does not apply to exports.
    assert_eq!(String::from_utf8(file.bytes).unwrap(), "Name\nAda\nBob\nCy\n");
}

#[tokio::test]
async fn export_uses_filters_and_sort() {
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .column("age", PeopleColumn::new("Age").sortable())
        .filter("status", PeopleFilter::new("select"));

    let ctx = RequestContext::new().with_query_string("filter[status]=active&sort=age&way=1");
    let ExportOutcome::File(file) = grid.export_as(&ctx, "csv").await.unwrap() else {
        panic!("expected a file");
    };
    assert!(file.filename.starts_with("people-"));
    assert_eq!(String::from_utf8(file.bytes).unwrap(), "Name,Age\nCy,2\nAda,3\n");
}

#[tokio::test]
async fn unknown_export_type_renders_json() {
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"));
    let ctx = RequestContext::new().with_query_string("export=pdf");
    let ExportOutcome::Rendered(response) = grid.export(&ctx).await.unwrap() else {
        panic!("expected a rendered response");
    };
    assert_eq!(response["state"]["count"], 3);
}

#[tokio::test]
async fn custom_exporters_are_used() {
    struct Lines;
    impl Exporter for Lines {
        fn extension(&self) -> &str {
            "txt"
        }
        fn content_type(&self) -> &str {
            "text/plain"
        }
        fn export(&self, table: &ExportTable) -> Result<Vec<u8>, GridError> {
            Ok(table
                .rows
                .iter()
                .map(|row| row.join("|"))
                .collect::<Vec<_>>()
                .join("\n")
                .into_bytes())
        }
    }

    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .column("age", PeopleColumn::new("Age"))
        .exporter("txt", Lines);
    let ctx = RequestContext::new().with_query_string("export=txt");
    let ExportOutcome::File(file) = grid.export(&ctx).await.unwrap() else {
        panic!("expected a file");
    };
    assert!(file.filename.ends_with(".txt"));
    assert_eq!(file.bytes, b"Ada|3\nBob|1\nCy|2");
}

#[tokio::test]
async fn empty_exports_fail() {
    let mut grid = Grid::new()
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .filter("status", PeopleFilter::new("select"));
    let ctx = RequestContext::new().with_query_string("filter[status]=archived&export=csv");
    let err = grid.export(&ctx).await.unwrap_err();
    assert!(matches!(err, GridError::Export(_)));
}

#[tokio::test]
async fn state_changes_notify_subscribers() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut grid = Grid::new().model(people());
    let sink = Arc::clone(&seen);
    let _subscription = grid.store().on("filter", move |value| {
        sink.lock().unwrap().push(value.clone());
    });
    grid.apply_request(&RequestContext::new().with_query_string("filter[status]=active"));
    assert_eq!(*seen.lock().unwrap(), vec![json!({ "status": "active" })]);
}

#[tokio::test]
async fn id_scoped_query_params_apply() {
    let mut grid = Grid::new()
        .id("people-grid")
        .model(people())
        .column("name", PeopleColumn::new("Name"))
        .filter("status", PeopleFilter::new("select"));

    let ctx = RequestContext::new()
        .with_query_string("people-grid[filter][status]=inactive&people-grid[page]=1");
    let response = grid.render(&ctx).await.unwrap();
    assert_eq!(names(&response), ["Bob"]);
    assert!(response["state"].get("people-grid").is_none());
}
