use std::path::{Path, PathBuf};

use rmcp::{
    ServiceExt,
    model::CallToolRequestParams,
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::json;

fn setup_fixture(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(
        data_dir.join("dataModels.json"),
        serde_json::to_vec(&json!({
            "models": [{
                "id": 1,
                "shortName": "CUST",
                "name": "Customer Model",
                "description": "Holds customer PII"
            }]
        }))?,
    )?;
    std::fs::write(
        data_dir.join("dataPolicies.json"),
        serde_json::to_vec(&json!({
            "policies": [{"id": "policy-001", "name": "Customer retention"}]
        }))?,
    )?;
    Ok(())
}

#[tokio::test]
async fn mcp_stdio_search_roundtrip() -> Result<(), Box<dyn std::error::Error>>
{
    let tempdir = tempfile::tempdir()?;
    setup_fixture(tempdir.path())?;

    let bin = datacat_bin()?;
    let transport = TokioChildProcess::new(
        tokio::process::Command::new(bin).configure(|cmd| {
            cmd.arg("mcp")
                .env("DATACAT_DATA_DIR", tempdir.path())
                .env("DATACAT_LOG", "warn");
        }),
    )?;

    let client = ().serve(transport).await?;

    let args = json!({
        "query": "customer",
        "types": "policies",
        "limit": 5
    });

    let result = client
        .peer()
        .call_tool(CallToolRequestParams::new("catalog_search").with_arguments(args.as_object().unwrap().clone()))
        .await?;

    let structured = result.structured_content.expect("structured content");
    let results = structured
        .get("results")
        .and_then(|v| v.as_array())
        .expect("results array");

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].get("_search_id").and_then(|v| v.as_str()),
        Some("policy-001")
    );
    assert_eq!(structured.get("total"), Some(&json!(1)));

    let stats = client
        .peer()
        .call_tool(CallToolRequestParams::new("catalog_stats"))
        .await?;
    let stats = stats.structured_content.expect("structured stats");
    assert_eq!(stats.get("total_documents"), Some(&json!(2)));
    assert_eq!(stats["documents_by_type"]["models"], json!(1));

    let suggest_args = json!({"query": "cust", "limit": 3});
    let suggest = client
        .peer()
        .call_tool(CallToolRequestParams::new("catalog_suggest").with_arguments(suggest_args.as_object().unwrap().clone()))
        .await?;
    let suggest = suggest.structured_content.expect("structured suggest");
    let suggestions = suggest["suggestions"].as_array().expect("suggestions");
    assert_eq!(suggestions.len(), 3);

    client.cancel().await?;
    Ok(())
}

fn datacat_bin() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(bin) = std::env::var("CARGO_BIN_EXE_datacat") {
        return Ok(PathBuf::from(bin));
    }

    let mut path = std::env::current_exe()?;
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("datacat");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    Ok(path)
}
