//! HTTP API tests, driving the router directly with tower's `oneshot`

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use qbom::core::loader::save_entity;
use qbom::core::{Config, Project};
use qbom::entities::{Assembly, Category, Group, Material, Template};
use qbom::selection::GroupType;
use qbom::server::{router, AppState};

struct Fixture {
    _tmp: TempDir,
    app: Router,
    category: String,
    toilets: String,
    extras: String,
    wall_hung: String,
    close_coupled: String,
    heater: String,
    template: String,
}

/// Plumbing category with a CHOOSE_ONE toilet group (200 default, 100)
/// and an OPTIONAL extras group (150), both attached to one template
fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let project = Project::init(tmp.path()).unwrap();

    let pipe = Material::new("Pipe", "m", 50.0, "t");
    let mut wall_hung = Assembly::new("Wall-hung WC", "t");
    wall_hung.add_material(pipe.id.clone(), 4.0);
    let mut close_coupled = Assembly::new("Close-coupled WC", "t");
    close_coupled.add_material(pipe.id.clone(), 2.0);
    let mut heater = Assembly::new("Water heater", "t");
    heater.add_material(pipe.id.clone(), 3.0);

    let category = Category::new("Plumbing", "t");
    let mut toilets = Group::new("Toilets", GroupType::ChooseOne, category.id.clone(), "t");
    toilets.add_item(wall_hung.id.clone(), 1.0, true).unwrap();
    toilets.add_item(close_coupled.id.clone(), 1.0, false).unwrap();
    let mut extras = Group::new("Extras", GroupType::Optional, category.id.clone(), "t");
    extras.sort_order = 1;
    extras.add_item(heater.id.clone(), 1.0, false).unwrap();

    let mut template = Template::new("Starter home", "t");
    template.add_group(toilets.id.clone());
    template.add_group(extras.id.clone());

    save_entity(&project, &pipe).unwrap();
    save_entity(&project, &wall_hung).unwrap();
    save_entity(&project, &close_coupled).unwrap();
    save_entity(&project, &heater).unwrap();
    save_entity(&project, &category).unwrap();
    save_entity(&project, &toilets).unwrap();
    save_entity(&project, &extras).unwrap();
    save_entity(&project, &template).unwrap();

    let app = router(AppState::new(project, Config::default()));
    Fixture {
        _tmp: tmp,
        app,
        category: category.id.to_string(),
        toilets: toilets.id.to_string(),
        extras: extras.id.to_string(),
        wall_hung: wall_hung.id.to_string(),
        close_coupled: close_coupled.id.to_string(),
        heater: heater.id.to_string(),
        template: template.id.to_string(),
    }
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let fx = fixture();
    let (status, body) = get(&fx.app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["currency"], "USD");
}

#[tokio::test]
async fn test_valid_group_selection_is_costed() {
    let fx = fixture();
    let selections = json!({
        fx.category.clone(): {
            fx.toilets.clone(): [fx.wall_hung],
            fx.extras.clone(): [fx.heater],
        }
    });
    let (status, body) = post_json(
        &fx.app,
        "/api/assembly-groups/validate-selection",
        json!({ "selections": selections }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["errors"], json!([]));
    assert_eq!(body["totalCost"], 350.0);
    let groups = body["breakdown"][0]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["groupName"], "Toilets");
    assert_eq!(groups[0]["subtotal"], 200.0);
}

#[tokio::test]
async fn test_choose_one_violation_reported() {
    let fx = fixture();
    let selections = json!({
        fx.category.clone(): { fx.toilets.clone(): [fx.wall_hung, fx.close_coupled] }
    });
    let (status, body) = post_json(
        &fx.app,
        "/api/assembly-groups/validate-selection",
        json!({ "selections": selections }),
    )
    .await;

    // Invalid selections are still a successful request
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], false);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["type"], "choose_one");
    assert_eq!(errors[0]["groupId"], fx.toilets.as_str());
    assert_eq!(errors[0]["details"]["expected"], 1);
    assert_eq!(errors[0]["details"]["selected"], 2);
}

#[tokio::test]
async fn test_missing_selections_is_bad_request() {
    let fx = fixture();
    let (status, body) =
        post_json(&fx.app, "/api/assembly-groups/validate-selection", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "selections are required");
}

#[tokio::test]
async fn test_malformed_ids_are_bad_request() {
    let fx = fixture();
    let (status, body) = post_json(
        &fx.app,
        "/api/assembly-groups/validate-selection",
        json!({ "selections": { "not-an-id": {} } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_template_selection_validates_all_template_groups() {
    let fx = fixture();
    // Toilets left out entirely still fails CHOOSE_ONE via template scope
    let (status, body) = post_json(
        &fx.app,
        "/api/templates/validate-selection",
        json!({ "templateId": fx.template, "selections": {} }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], false);
    assert_eq!(body["errors"][0]["type"], "choose_one");
    assert_eq!(body["totalCost"], 0.0);
}

#[tokio::test]
async fn test_template_selection_requires_template_id() {
    let fx = fixture();
    let (status, body) = post_json(
        &fx.app,
        "/api/templates/validate-selection",
        json!({ "selections": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "templateId is required");
}

#[tokio::test]
async fn test_unknown_template_is_not_found() {
    let fx = fixture();
    let (status, body) = post_json(
        &fx.app,
        "/api/templates/validate-selection",
        json!({ "templateId": "TMPL-01HC2JB7SMQX7RS1Y0GFKBHPTD", "selections": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("template not found"));
}

#[tokio::test]
async fn test_default_selection_uses_item_defaults() {
    let fx = fixture();
    let (status, body) = get(
        &fx.app,
        &format!("/api/templates/{}/default-selection", fx.template),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["templateId"], fx.template.as_str());
    assert_eq!(
        body["selections"][fx.category.as_str()][fx.toilets.as_str()],
        json!([fx.wall_hung])
    );
    assert_eq!(
        body["selections"][fx.category.as_str()][fx.extras.as_str()],
        json!([])
    );
    assert_eq!(body["validation"]["isValid"], true);
    assert_eq!(body["validation"]["totalCost"], 200.0);
}
