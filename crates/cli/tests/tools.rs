//! End-to-end runs of the tool commands against mock providers.

use serde_json::{Value, json};
use tempfile::TempDir;
use toolbelt_cli::tools::airtable::{self, AirtableCli};
use toolbelt_cli::tools::grok::{self, GrokCli};
use toolbelt_cli::tools::weather::{self, WeatherCli};
use toolbelt_core::{ToolConfig, ToolContext, ToolSpec};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clap::Parser;
use serial_test::serial;

fn context(spec: ToolSpec, dir: &TempDir, base_url: &str) -> ToolContext {
    let ctx = ToolContext::new(spec, dir.path());
    ToolConfig::save_api_key(&ctx, "test-key").unwrap();
    ToolConfig::save_value(&ctx, "base_url", base_url).unwrap();
    ctx
}

fn current_weather() -> Value {
    json!({
        "coord": {"lon": 10.75, "lat": 59.91},
        "weather": [{"description": "light snow"}],
        "main": {"temp": -2.5, "feels_like": -6.0, "temp_min": -3.0, "temp_max": -1.0, "pressure": 1012, "humidity": 86},
        "wind": {"speed": 4.1, "deg": 200},
        "clouds": {"all": 90},
        "visibility": 4000,
        "dt": 1700000000,
        "sys": {"country": "NO", "sunrise": 1699944000, "sunset": 1699971000},
        "name": "Oslo"
    })
}

async fn run_weather(ctx: &ToolContext, args: &[&str]) -> String {
    let cli = WeatherCli::try_parse_from(std::iter::once("weather-cli").chain(args.iter().copied())).unwrap();
    let mut buf = Vec::new();
    weather::run(ctx, cli, &mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn test_weather_second_lookup_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Oslo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(weather::TOOL, &dir, &server.uri());

    let output = run_weather(&ctx, &["current", "--city", "Oslo", "--json"]).await;
    let first: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(first["from_cache"], false);
    assert_eq!(first["location"]["name"], "Oslo");

    let second: Value =
        serde_json::from_str(&run_weather(&ctx, &["current", "--city", "Oslo", "--json"]).await).unwrap();
    assert_eq!(second["from_cache"], true);
    assert_eq!(second["current"], first["current"]);

    let stats: Value = serde_json::from_str(&run_weather(&ctx, &["cache", "stats", "--json"]).await).unwrap();
    assert_eq!(stats["entries"], 1);
}

#[tokio::test]
async fn test_weather_human_output_is_not_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(weather::TOOL, &dir, &server.uri());

    let text = run_weather(&ctx, &["current", "--city", "Oslo", "--no-cache"]).await;
    assert!(text.contains("Oslo"));
    assert!(serde_json::from_str::<Value>(&text).is_err());
}

#[tokio::test]
#[serial]
async fn test_weather_missing_key_fails_before_request() {
    // SAFETY: serialized with every other test that touches the credential variable.
    unsafe { std::env::remove_var("OPENWEATHERMAP_API_KEY") };

    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let dir = TempDir::new().unwrap();
    let ctx = ToolContext::new(weather::TOOL, dir.path());
    ToolConfig::save_value(&ctx, "base_url", &server.uri()).unwrap();

    let cli = WeatherCli::try_parse_from(["weather-cli", "current", "--city", "Oslo"]).unwrap();
    let err = weather::run(&ctx, cli, &mut Vec::new()).await.unwrap_err();
    assert!(format!("{err:#}").contains("OPENWEATHERMAP_API_KEY"));
}

#[tokio::test]
async fn test_grok_session_carries_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "grok-3",
            "choices": [{"message": {"role": "assistant", "content": "noted"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(grok::TOOL, &dir, &format!("{}/v1", server.uri()));

    for prompt in ["my name is Ada", "what is my name?"] {
        let cli = GrokCli::try_parse_from(["grok-cli", "chat", prompt, "--session", "intro", "--json"]).unwrap();
        let mut buf = Vec::new();
        grok::run(&ctx, cli, &mut buf).await.unwrap();
        let reply: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(reply["response"], "noted");
    }

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let roles: Vec<&str> = body["messages"].as_array().unwrap().iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, ["user", "assistant", "user"]);
    assert_eq!(body["messages"][0]["content"], "my name is Ada");

    let stored: Value = serde_json::from_str(&std::fs::read_to_string(ctx.sessions_dir().join("intro.json")).unwrap())
        .unwrap();
    let stored_roles: Vec<&str> =
        stored["messages"].as_array().unwrap().iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(stored_roles, ["user", "assistant", "user", "assistant"]);
}

fn grok_completion(text: &str) -> Value {
    json!({
        "model": "grok-3",
        "choices": [{"message": {"role": "assistant", "content": text}}],
        "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
    })
}

async fn run_grok(ctx: &ToolContext, args: &[&str]) -> Value {
    let cli = GrokCli::try_parse_from(std::iter::once("grok-cli").chain(args.iter().copied())).unwrap();
    let mut buf = Vec::new();
    grok::run(ctx, cli, &mut buf).await.unwrap();
    serde_json::from_slice(&buf).unwrap()
}

#[tokio::test]
async fn test_grok_plain_chat_sends_single_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grok_completion("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(grok::TOOL, &dir, &format!("{}/v1", server.uri()));
    run_grok(&ctx, &["chat", "hello", "--json"]).await;

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"], json!([{"role": "user", "content": "hello"}]));
}

#[tokio::test]
async fn test_grok_configured_style_adds_system_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grok_completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(grok::TOOL, &dir, &format!("{}/v1", server.uri()));
    ToolConfig::save_value(&ctx, "default_style", "serious").unwrap();
    run_grok(&ctx, &["chat", "hello", "--json"]).await;

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let roles: Vec<&str> = body["messages"].as_array().unwrap().iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, ["system", "user"]);
}

#[tokio::test]
async fn test_grok_reports_use_default_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "grok-3-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(grok_completion("1. #RustConf")))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(grok::TOOL, &dir, &format!("{}/v1", server.uri()));
    ToolConfig::save_value(&ctx, "default_model", "grok-3-mini").unwrap();

    let trending = run_grok(&ctx, &["trending", "--category", "tech", "--json"]).await;
    assert_eq!(trending["trends"], "1. #RustConf");
    assert_eq!(trending["category"], "tech");
    assert_eq!(trending["limit"], 10);
    assert!(trending["timestamp"].is_string());

    let track = run_grok(&ctx, &["track", "RustConf", "--duration", "1h", "--json"]).await;
    assert_eq!(track["keyword"], "RustConf");
    assert_eq!(track["duration"], "1h");
    assert_eq!(track["analysis"], "1. #RustConf");

    let sentiment = run_grok(&ctx, &["sentiment", "RustConf", "--json"]).await;
    assert_eq!(sentiment["topic"], "RustConf");
    assert_eq!(sentiment["posts_analyzed"], 100);
    assert_eq!(sentiment["sentiment_analysis"], "1. #RustConf");
}

#[tokio::test]
async fn test_airtable_token_flag_and_table_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/appABCDEFGHIJKLMN/Tasks"))
        .and(header("authorization", "Bearer patOverride"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "recAAAAAAAAAAAAAA", "createdTime": "2024-01-01T00:00:00.000Z", "fields": {"Name": "One"}},
                {"id": "recBBBBBBBBBBBBBB", "createdTime": "2024-01-02T00:00:00.000Z", "fields": {"Name": "Two"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = context(airtable::TOOL, &dir, &format!("{}/v0", server.uri()));

    let cli = AirtableCli::try_parse_from([
        "airtable-cli",
        "--token",
        "patOverride",
        "list",
        "appABCDEFGHIJKLMN",
        "Tasks",
        "--format",
        "table",
    ])
    .unwrap();
    let mut buf = Vec::new();
    airtable::run(&ctx, cli, &mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("recBBBBBBBBBBBBBB"));
    assert!(text.contains("Total: 2 records"));
}

fn airtable_tasks(server_uri: &str, dir: &TempDir) -> ToolContext {
    context(airtable::TOOL, dir, &format!("{server_uri}/v0"))
}

async fn run_airtable(ctx: &ToolContext, args: &[&str]) -> String {
    let cli = AirtableCli::try_parse_from(std::iter::once("airtable-cli").chain(args.iter().copied())).unwrap();
    let mut buf = Vec::new();
    airtable::run(ctx, cli, &mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn test_airtable_fields_lists_one_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/meta/bases/appABCDEFGHIJKLMN/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [
                {"id": "tblTasks000000000", "name": "Tasks", "fields": [
                    {"id": "fldName", "name": "Name", "type": "singleLineText"},
                    {"id": "fldDone", "name": "Done", "type": "checkbox", "options": {"color": "greenBright"}}
                ]},
                {"id": "tblPeople00000000", "name": "People", "fields": [
                    {"id": "fldEmail", "name": "Email", "type": "email"}
                ]}
            ]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = airtable_tasks(&server.uri(), &dir);

    let fields: Value =
        serde_json::from_str(&run_airtable(&ctx, &["fields", "appABCDEFGHIJKLMN", "Tasks", "--json"]).await).unwrap();
    let names: Vec<&str> = fields.as_array().unwrap().iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Name", "Done"]);
    assert_eq!(fields[1]["options"]["color"], "greenBright");

    let text = run_airtable(&ctx, &["fields", "appABCDEFGHIJKLMN", "tblPeople00000000"]).await;
    assert!(text.contains("Fields in People (1 total)"));

    let cli = AirtableCli::try_parse_from(["airtable-cli", "fields", "appABCDEFGHIJKLMN", "Nope"]).unwrap();
    let err = airtable::run(&ctx, cli, &mut Vec::new()).await.unwrap_err();
    assert!(format!("{err:#}").contains("Nope"));
}

fn export_page() -> Value {
    json!({
        "records": [
            {"id": "recAAAAAAAAAAAAAA", "createdTime": "2024-01-01T00:00:00.000Z", "fields": {"Name": "One, two", "Points": 3}},
            {"id": "recBBBBBBBBBBBBBB", "createdTime": "2024-01-02T00:00:00.000Z", "fields": {"Name": "Three"}}
        ]
    })
}

#[tokio::test]
async fn test_airtable_export_csv_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/appABCDEFGHIJKLMN/Tasks"))
        .and(query_param("view", "Grid view"))
        .respond_with(ResponseTemplate::new(200).set_body_json(export_page()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = airtable_tasks(&server.uri(), &dir);
    let target = dir.path().join("tasks.csv");
    let target_arg = target.to_str().unwrap();

    let notice: Value = serde_json::from_str(
        &run_airtable(
            &ctx,
            &["export", "appABCDEFGHIJKLMN", "Tasks", "--view", "Grid view", "--output", target_arg, "--json"],
        )
        .await,
    )
    .unwrap();
    assert_eq!(notice["ok"], true);
    assert!(notice["message"].as_str().unwrap().contains("Exported 2 records"));

    let csv = std::fs::read_to_string(&target).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "id,createdTime,Name,Points");
    assert_eq!(lines[1], "recAAAAAAAAAAAAAA,2024-01-01T00:00:00.000Z,\"One, two\",3");
    assert_eq!(lines[2], "recBBBBBBBBBBBBBB,2024-01-02T00:00:00.000Z,Three,");
}

#[tokio::test]
async fn test_airtable_export_json_to_stdout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/appABCDEFGHIJKLMN/Tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(export_page()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = airtable_tasks(&server.uri(), &dir);

    let exported: Value =
        serde_json::from_str(&run_airtable(&ctx, &["export", "appABCDEFGHIJKLMN", "Tasks"]).await).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 2);
    assert_eq!(exported[0]["fields"]["Points"], 3);
    assert_eq!(exported[1]["createdTime"], "2024-01-02T00:00:00.000Z");
}
